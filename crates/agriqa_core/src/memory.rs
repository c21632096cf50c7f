//! crates/agriqa_core/src/memory.rs
//!
//! An in-memory implementation of the `QaStore` port, used by the engine's
//! tests and for running the service locally without PostgreSQL. A single
//! mutex over the whole state makes every operation atomic, which is exactly
//! the guarantee the uniqueness invariants need.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{
    Acceptance, Answer, Message, NewMessage, Question, QuestionStatus, Rating, ReplyKind,
    SenderKind,
};
use crate::ports::{QaError, QaResult, QaStore};

#[derive(Default)]
struct State {
    next_id: i64,
    questions: BTreeMap<i64, Question>,
    answers: BTreeMap<i64, Answer>,
    ratings: BTreeMap<i64, Rating>,
    messages: BTreeMap<i64, Message>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// An in-memory `QaStore`, cheap to construct per test.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> QaResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| QaError::StorageUnavailable("store mutex poisoned".to_string()))
    }
}

/// Sorts by submission time ascending, ties broken by insertion order.
fn sorted_by_submission(mut answers: Vec<Answer>) -> Vec<Answer> {
    answers.sort_by_key(|a| (a.created_at, a.id));
    answers
}

#[async_trait]
impl QaStore for InMemoryStore {
    async fn create_question(
        &self,
        farmer_id: i64,
        farmer_name: &str,
        category: &str,
        body: &str,
    ) -> QaResult<Question> {
        let mut state = self.state()?;
        let id = state.next_id();
        let question = Question {
            id,
            farmer_id,
            farmer_name: farmer_name.to_string(),
            category: category.to_string(),
            body: body.to_string(),
            status: QuestionStatus::Open,
            ai_answer: None,
            created_at: Utc::now(),
        };
        state.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn question_by_id(&self, question_id: i64) -> QaResult<Question> {
        self.state()?
            .questions
            .get(&question_id)
            .cloned()
            .ok_or_else(|| QaError::NotFound(format!("question {question_id}")))
    }

    async fn list_questions(&self) -> QaResult<Vec<Question>> {
        let state = self.state()?;
        let mut questions: Vec<Question> = state.questions.values().cloned().collect();
        questions.sort_by_key(|q| std::cmp::Reverse((q.created_at, q.id)));
        Ok(questions)
    }

    async fn questions_by_farmer(&self, farmer_id: i64) -> QaResult<Vec<Question>> {
        let state = self.state()?;
        let mut questions: Vec<Question> = state
            .questions
            .values()
            .filter(|q| q.farmer_id == farmer_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| std::cmp::Reverse((q.created_at, q.id)));
        Ok(questions)
    }

    async fn set_question_status(&self, question_id: i64, status: QuestionStatus) -> QaResult<()> {
        let mut state = self.state()?;
        let question = state
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| QaError::NotFound(format!("question {question_id}")))?;
        question.status = status;
        Ok(())
    }

    async fn record_ai_answer(&self, question_id: i64, answer_text: &str) -> QaResult<()> {
        let mut state = self.state()?;
        let question = state
            .questions
            .get_mut(&question_id)
            .ok_or_else(|| QaError::NotFound(format!("question {question_id}")))?;
        question.ai_answer = Some(answer_text.to_string());
        question.status = QuestionStatus::Answered;
        Ok(())
    }

    async fn delete_question(&self, question_id: i64) -> QaResult<()> {
        let mut state = self.state()?;
        if state.questions.remove(&question_id).is_none() {
            return Err(QaError::NotFound(format!("question {question_id}")));
        }
        // Detach rather than delete: answers outlive their question so the
        // authors' historical counts survive.
        for answer in state.answers.values_mut() {
            if answer.question_id == Some(question_id) {
                answer.question_id = None;
            }
        }
        Ok(())
    }

    async fn insert_original_answer(
        &self,
        question_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
    ) -> QaResult<Answer> {
        let mut state = self.state()?;
        if !state.questions.contains_key(&question_id) {
            return Err(QaError::NotFound(format!("question {question_id}")));
        }
        let duplicate = state.answers.values().any(|a| {
            a.parent_id.is_none() && a.question_id == Some(question_id) && a.expert_id == expert_id
        });
        if duplicate {
            return Err(QaError::DuplicateAnswer {
                question_id,
                expert_id,
            });
        }
        let id = state.next_id();
        let answer = Answer {
            id,
            question_id: Some(question_id),
            expert_id,
            expert_name: expert_name.to_string(),
            body: body.to_string(),
            parent_id: None,
            kind: None,
            acceptance: Acceptance::Pending,
            created_at: Utc::now(),
        };
        state.answers.insert(id, answer.clone());
        Ok(answer)
    }

    async fn upsert_reply(
        &self,
        parent_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
        kind: ReplyKind,
    ) -> QaResult<Answer> {
        let mut state = self.state()?;
        let parent_question = state
            .answers
            .get(&parent_id)
            .ok_or(QaError::UnknownParent(parent_id))?
            .question_id;

        let existing = state
            .answers
            .values_mut()
            .find(|a| a.parent_id == Some(parent_id) && a.expert_id == expert_id);
        if let Some(reply) = existing {
            reply.body = body.to_string();
            reply.kind = Some(kind);
            reply.created_at = Utc::now();
            return Ok(reply.clone());
        }

        let id = state.next_id();
        let reply = Answer {
            id,
            question_id: parent_question,
            expert_id,
            expert_name: expert_name.to_string(),
            body: body.to_string(),
            parent_id: Some(parent_id),
            kind: Some(kind),
            acceptance: Acceptance::Pending,
            created_at: Utc::now(),
        };
        state.answers.insert(id, reply.clone());
        Ok(reply)
    }

    async fn answer_by_id(&self, answer_id: i64) -> QaResult<Answer> {
        self.state()?
            .answers
            .get(&answer_id)
            .cloned()
            .ok_or_else(|| QaError::NotFound(format!("answer {answer_id}")))
    }

    async fn set_acceptance(&self, answer_id: i64, acceptance: Acceptance) -> QaResult<()> {
        let mut state = self.state()?;
        let answer = state
            .answers
            .get_mut(&answer_id)
            .ok_or_else(|| QaError::NotFound(format!("answer {answer_id}")))?;
        answer.acceptance = acceptance;
        Ok(())
    }

    async fn original_answers_for_question(&self, question_id: i64) -> QaResult<Vec<Answer>> {
        let state = self.state()?;
        let answers = state
            .answers
            .values()
            .filter(|a| a.parent_id.is_none() && a.question_id == Some(question_id))
            .cloned()
            .collect();
        Ok(sorted_by_submission(answers))
    }

    async fn replies_for_answer(&self, parent_id: i64) -> QaResult<Vec<Answer>> {
        let state = self.state()?;
        let replies = state
            .answers
            .values()
            .filter(|a| a.parent_id == Some(parent_id))
            .cloned()
            .collect();
        Ok(sorted_by_submission(replies))
    }

    async fn has_answered(&self, question_id: i64, expert_id: i64) -> QaResult<bool> {
        let state = self.state()?;
        Ok(state.answers.values().any(|a| {
            a.parent_id.is_none() && a.question_id == Some(question_id) && a.expert_id == expert_id
        }))
    }

    async fn count_original_answers(&self, expert_id: i64) -> QaResult<u64> {
        let state = self.state()?;
        Ok(state
            .answers
            .values()
            .filter(|a| a.parent_id.is_none() && a.expert_id == expert_id)
            .count() as u64)
    }

    async fn count_accepted_replies(&self, expert_id: i64) -> QaResult<u64> {
        let state = self.state()?;
        Ok(state
            .answers
            .values()
            .filter(|a| {
                a.parent_id.is_some()
                    && a.expert_id == expert_id
                    && a.acceptance == Acceptance::Accepted
            })
            .count() as u64)
    }

    async fn upsert_rating(
        &self,
        farmer_id: i64,
        expert_id: i64,
        answer_id: i64,
        score: i16,
        comment: Option<&str>,
    ) -> QaResult<Rating> {
        let mut state = self.state()?;
        if !state.answers.contains_key(&answer_id) {
            return Err(QaError::NotFound(format!("answer {answer_id}")));
        }
        let existing = state
            .ratings
            .values_mut()
            .find(|r| r.farmer_id == farmer_id && r.answer_id == answer_id);
        if let Some(rating) = existing {
            rating.score = score;
            rating.comment = comment.map(str::to_string);
            rating.created_at = Utc::now();
            return Ok(rating.clone());
        }
        let id = state.next_id();
        let rating = Rating {
            id,
            expert_id,
            farmer_id,
            answer_id,
            score,
            comment: comment.map(str::to_string),
            created_at: Utc::now(),
        };
        state.ratings.insert(id, rating.clone());
        Ok(rating)
    }

    async fn ratings_for_expert(&self, expert_id: i64) -> QaResult<Vec<Rating>> {
        let state = self.state()?;
        let mut ratings: Vec<Rating> = state
            .ratings
            .values()
            .filter(|r| r.expert_id == expert_id)
            .cloned()
            .collect();
        ratings.sort_by_key(|r| (r.created_at, r.id));
        Ok(ratings)
    }

    async fn append_message(&self, message: NewMessage) -> QaResult<Message> {
        let mut state = self.state()?;
        let id = state.next_id();
        let message = Message {
            id,
            conversation_key: message.conversation_key,
            farmer_id: message.farmer_id,
            expert_id: message.expert_id,
            question_id: message.question_id,
            answer_id: message.answer_id,
            sender_kind: message.sender_kind,
            sender_name: message.sender_name,
            body: message.body,
            read: false,
            sent_at: Utc::now(),
        };
        state.messages.insert(id, message.clone());
        Ok(message)
    }

    async fn conversation_messages(&self, conversation_key: &str) -> QaResult<Vec<Message>> {
        let state = self.state()?;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| m.conversation_key == conversation_key)
            .cloned()
            .collect();
        messages.sort_by_key(|m| (m.sent_at, m.id));
        Ok(messages)
    }

    async fn conversation_previews(&self) -> QaResult<Vec<Message>> {
        let state = self.state()?;
        let mut latest: BTreeMap<String, Message> = BTreeMap::new();
        for message in state.messages.values() {
            match latest.get(&message.conversation_key) {
                Some(current) if (current.sent_at, current.id) >= (message.sent_at, message.id) => {}
                _ => {
                    latest.insert(message.conversation_key.clone(), message.clone());
                }
            }
        }
        Ok(latest.into_values().collect())
    }

    async fn mark_conversation_read(
        &self,
        conversation_key: &str,
        authored_by: SenderKind,
    ) -> QaResult<()> {
        let mut state = self.state()?;
        for message in state.messages.values_mut() {
            if message.conversation_key == conversation_key && message.sender_kind == authored_by {
                message.read = true;
            }
        }
        Ok(())
    }

    async fn delete_conversation(&self, conversation_key: &str) -> QaResult<()> {
        let mut state = self.state()?;
        state
            .messages
            .retain(|_, m| m.conversation_key != conversation_key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn farmer_note(key: &str, body: &str) -> NewMessage {
        NewMessage {
            conversation_key: key.to_string(),
            farmer_id: Some(3),
            expert_id: 7,
            question_id: None,
            answer_id: None,
            sender_kind: SenderKind::Farmer,
            sender_name: "Asha".to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_insertion_order() {
        let store = InMemoryStore::new();
        for body in ["one", "two", "three"] {
            store
                .append_message(farmer_note("farmer_3_expert_7", body))
                .await
                .unwrap();
        }
        // Collapse the clock so only the id tie-break can order them.
        let frozen = Utc::now();
        for message in store.state().unwrap().messages.values_mut() {
            message.sent_at = frozen;
        }

        let messages = store
            .conversation_messages("farmer_3_expert_7")
            .await
            .unwrap();
        let bodies: Vec<&str> = messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["one", "two", "three"]);

        // The same tie-break picks the latest-inserted message as preview.
        let previews = store.conversation_previews().await.unwrap();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].body, "three");
    }
}
