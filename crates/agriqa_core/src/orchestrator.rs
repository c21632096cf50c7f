//! crates/agriqa_core/src/orchestrator.rs
//!
//! The Q&A orchestrator: the façade upstream callers use. It owns the
//! question lifecycle (`Open` until the first answer, `Answered` after),
//! performs the ownership checks the store deliberately leaves to its
//! callers, and hands AI-generated answers the same status-flipping power as
//! expert answers without ever admitting them to the reply workflow.

use std::sync::Arc;

use tracing::info;

use crate::answers::AnswerStore;
use crate::domain::{Actor, Answer, Question, QuestionStatus, Rating, ReplyKind};
use crate::ports::{AnswerGenerator, QaError, QaResult, QaStore};

#[derive(Clone)]
pub struct QaOrchestrator {
    store: Arc<dyn QaStore>,
    answers: AnswerStore,
    generator: Arc<dyn AnswerGenerator>,
}

impl QaOrchestrator {
    pub fn new(store: Arc<dyn QaStore>, generator: Arc<dyn AnswerGenerator>) -> Self {
        Self {
            answers: AnswerStore::new(store.clone()),
            store,
            generator,
        }
    }

    /// The answer store this orchestrator coordinates, for read access.
    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    // --- Questions ---

    /// Creates a new question in `Open` status.
    pub async fn ask_question(
        &self,
        farmer_id: i64,
        farmer_name: &str,
        category: &str,
        body: &str,
    ) -> QaResult<Question> {
        let question = self
            .store
            .create_question(farmer_id, farmer_name, category, body)
            .await?;
        info!(question_id = question.id, farmer_id, category, "question asked");
        Ok(question)
    }

    /// Asks the answer-generator oracle for an AI answer. A produced answer
    /// is stored on the question itself and flips it to `Answered`; the
    /// oracle declining leaves the question open for experts. AI answers
    /// never enter the reply/correction/acceptance workflow.
    pub async fn request_ai_answer(&self, question_id: i64) -> QaResult<Option<String>> {
        let question = self.store.question_by_id(question_id).await?;
        match self
            .generator
            .generate_answer(&question.category, &question.body)
            .await?
        {
            Some(text) => {
                self.store.record_ai_answer(question_id, &text).await?;
                info!(question_id, "ai answer recorded");
                Ok(Some(text))
            }
            None => {
                info!(question_id, "ai oracle declined, question stays open");
                Ok(None)
            }
        }
    }

    pub async fn question(&self, question_id: i64) -> QaResult<Question> {
        self.store.question_by_id(question_id).await
    }

    /// All questions, newest first.
    pub async fn list_questions(&self) -> QaResult<Vec<Question>> {
        self.store.list_questions().await
    }

    /// One farmer's own questions, newest first.
    pub async fn questions_for_farmer(&self, farmer_id: i64) -> QaResult<Vec<Question>> {
        self.store.questions_by_farmer(farmer_id).await
    }

    /// Deletes a question on the owning farmer's explicit request. Direct
    /// answers are detached, not erased; historical reputation counts
    /// survive the cleanup.
    pub async fn delete_question(&self, actor: Actor, question_id: i64) -> QaResult<()> {
        let farmer_id = match actor {
            Actor::Farmer(id) => id,
            Actor::Expert(_) => {
                return Err(QaError::NotAuthorized(
                    "only the asking farmer may delete a question".to_string(),
                ))
            }
        };
        let question = self.store.question_by_id(question_id).await?;
        if question.farmer_id != farmer_id {
            return Err(QaError::NotAuthorized(format!(
                "farmer {farmer_id} does not own question {question_id}"
            )));
        }
        self.store.delete_question(question_id).await?;
        info!(question_id, farmer_id, "question deleted");
        Ok(())
    }

    // --- Answers and replies ---

    /// Records an expert's original answer and flips the question to
    /// `Answered` if it was still open.
    pub async fn answer_question(
        &self,
        question_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
    ) -> QaResult<Answer> {
        let answer = self
            .answers
            .submit_answer(question_id, expert_id, expert_name, body)
            .await?;
        self.store
            .set_question_status(question_id, QuestionStatus::Answered)
            .await?;
        Ok(answer)
    }

    /// Records an expert's reply to another expert's answer. The question is
    /// already `Answered`, so its status does not change.
    pub async fn reply_to_answer(
        &self,
        parent_answer_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
        kind: ReplyKind,
    ) -> QaResult<Answer> {
        self.answers
            .submit_reply(parent_answer_id, expert_id, expert_name, body, kind)
            .await
    }

    /// Applies the farmer's accept/deny verdict to a reply. Only the farmer
    /// who owns the question the reply's parent answer belongs to may decide
    /// it. Re-deciding flips between accepted and denied; a decided reply
    /// never reverts to pending. No cascading recompute follows: the
    /// reputation aggregator is pull-based.
    pub async fn resolve_reply(&self, actor: Actor, reply_id: i64, accept: bool) -> QaResult<()> {
        let farmer_id = match actor {
            Actor::Farmer(id) => id,
            Actor::Expert(_) => {
                return Err(QaError::NotAuthorized(
                    "only the asking farmer may decide a reply".to_string(),
                ))
            }
        };

        let reply = self.store.answer_by_id(reply_id).await?;
        let parent_id = reply
            .parent_id
            .ok_or_else(|| QaError::NotFound(format!("answer {reply_id} is not a reply")))?;
        let parent = self.store.answer_by_id(parent_id).await?;
        let question_id = parent.question_id.ok_or_else(|| {
            QaError::NotFound(format!(
                "the question answered by {parent_id} no longer exists"
            ))
        })?;
        let question = self.store.question_by_id(question_id).await?;
        if question.farmer_id != farmer_id {
            return Err(QaError::NotAuthorized(format!(
                "farmer {farmer_id} does not own question {question_id}"
            )));
        }

        self.answers.decide(reply_id, accept).await
    }

    // --- Ratings ---

    /// Records a farmer's rating of an expert answer. Only farmers may rate;
    /// the score must lie in 1..=5; one rating per (farmer, answer), with
    /// resubmission overwriting the first.
    pub async fn rate_answer(
        &self,
        actor: Actor,
        answer_id: i64,
        score: i16,
        comment: Option<&str>,
    ) -> QaResult<Rating> {
        let farmer_id = match actor {
            Actor::Farmer(id) => id,
            Actor::Expert(_) => {
                return Err(QaError::NotAuthorized(
                    "only farmers may rate answers".to_string(),
                ))
            }
        };
        if !(1..=5).contains(&score) {
            return Err(QaError::InvalidScore(score));
        }

        let answer = self.store.answer_by_id(answer_id).await?;
        let rating = self
            .store
            .upsert_rating(farmer_id, answer.expert_id, answer_id, score, comment)
            .await?;
        info!(answer_id, farmer_id, score, "answer rated");
        Ok(rating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::reputation::ReputationAggregator;
    use async_trait::async_trait;

    /// A canned oracle: returns its configured answer, or declines.
    struct FixedGenerator(Option<String>);

    #[async_trait]
    impl AnswerGenerator for FixedGenerator {
        async fn generate_answer(&self, _category: &str, _question: &str) -> QaResult<Option<String>> {
            Ok(self.0.clone())
        }
    }

    fn orchestrator(
        generated: Option<&str>,
    ) -> (QaOrchestrator, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let generator = Arc::new(FixedGenerator(generated.map(str::to_string)));
        (QaOrchestrator::new(store.clone(), generator), store)
    }

    #[tokio::test]
    async fn first_expert_answer_flips_question_to_answered() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "Asha", "pests", "Leaf curl on chilli?").await.unwrap();
        assert_eq!(question.status, QuestionStatus::Open);

        qa.answer_question(question.id, 7, "Dr. Rao", "Spray neem oil.").await.unwrap();
        let reloaded = qa.question(question.id).await.unwrap();
        assert_eq!(reloaded.status, QuestionStatus::Answered);
    }

    #[tokio::test]
    async fn ai_answer_flips_status_but_stays_out_of_the_answer_tree() {
        let (qa, _) = orchestrator(Some("Rotate crops and solarize the soil."));
        let question = qa.ask_question(1, "Asha", "soil", "Nematodes in tomato beds?").await.unwrap();

        let text = qa.request_ai_answer(question.id).await.unwrap();
        assert_eq!(text.as_deref(), Some("Rotate crops and solarize the soil."));

        let reloaded = qa.question(question.id).await.unwrap();
        assert_eq!(reloaded.status, QuestionStatus::Answered);
        assert_eq!(reloaded.ai_answer.as_deref(), Some("Rotate crops and solarize the soil."));
        // No expert answer rows were created for it.
        assert!(qa.answers().list_original_answers(question.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_oracle_leaves_question_open() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "Asha", "weather", "Rain forecast for sowing?").await.unwrap();
        assert_eq!(qa.request_ai_answer(question.id).await.unwrap(), None);
        assert_eq!(qa.question(question.id).await.unwrap().status, QuestionStatus::Open);
    }

    #[tokio::test]
    async fn correction_scenario_counts_toward_the_correcting_expert() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let e1_answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();
        let e2_reply = qa
            .reply_to_answer(e1_answer.id, 12, "E2", "Use copper fungicide instead.", ReplyKind::Correction)
            .await
            .unwrap();

        qa.resolve_reply(Actor::Farmer(1), e2_reply.id, true).await.unwrap();

        assert_eq!(qa.answers().count_accepted_replies(12).await.unwrap(), 1);
        assert_eq!(qa.answers().count_accepted_replies(11).await.unwrap(), 0);
        let replies = qa.answers().list_replies(e1_answer.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].acceptance, crate::domain::Acceptance::Accepted);
    }

    #[tokio::test]
    async fn only_the_question_owner_may_resolve_a_reply() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();
        let reply = qa
            .reply_to_answer(answer.id, 12, "E2", "Wrong, use copper.", ReplyKind::Correction)
            .await
            .unwrap();

        let other_farmer = qa.resolve_reply(Actor::Farmer(2), reply.id, true).await.unwrap_err();
        assert!(matches!(other_farmer, QaError::NotAuthorized(_)));
        let an_expert = qa.resolve_reply(Actor::Expert(11), reply.id, true).await.unwrap_err();
        assert!(matches!(an_expert, QaError::NotAuthorized(_)));
    }

    #[tokio::test]
    async fn resolving_an_original_answer_is_refused() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();

        let err = qa.resolve_reply(Actor::Farmer(1), answer.id, true).await.unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
        assert_eq!(
            qa.answers().answer_by_id(answer.id).await.unwrap().acceptance,
            crate::domain::Acceptance::Pending
        );
    }

    #[tokio::test]
    async fn rating_validates_actor_and_score_before_storage() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();

        let expert = qa.rate_answer(Actor::Expert(12), answer.id, 5, None).await.unwrap_err();
        assert!(matches!(expert, QaError::NotAuthorized(_)));
        let low = qa.rate_answer(Actor::Farmer(1), answer.id, 0, None).await.unwrap_err();
        assert!(matches!(low, QaError::InvalidScore(0)));
        let high = qa.rate_answer(Actor::Farmer(1), answer.id, 6, None).await.unwrap_err();
        assert!(matches!(high, QaError::InvalidScore(6)));

        let rating = qa.rate_answer(Actor::Farmer(1), answer.id, 5, Some("solved it")).await.unwrap();
        assert_eq!(rating.expert_id, 11);
        assert_eq!(rating.score, 5);
    }

    #[tokio::test]
    async fn rating_twice_overwrites_and_feeds_the_aggregator_once() {
        let (qa, store) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();

        qa.rate_answer(Actor::Farmer(1), answer.id, 3, None).await.unwrap();
        qa.rate_answer(Actor::Farmer(1), answer.id, 5, None).await.unwrap();

        let aggregator = ReputationAggregator::new(store);
        assert_eq!(aggregator.rating_count(11).await.unwrap(), 1);
        assert_eq!(aggregator.average_rating(11).await.unwrap(), Some(5.0));
    }

    #[tokio::test]
    async fn question_deletion_is_owner_only_and_detaches_answers() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();

        let not_owner = qa.delete_question(Actor::Farmer(2), question.id).await.unwrap_err();
        assert!(matches!(not_owner, QaError::NotAuthorized(_)));
        let expert = qa.delete_question(Actor::Expert(11), question.id).await.unwrap_err();
        assert!(matches!(expert, QaError::NotAuthorized(_)));

        qa.delete_question(Actor::Farmer(1), question.id).await.unwrap();
        assert!(matches!(qa.question(question.id).await, Err(QaError::NotFound(_))));

        let detached = qa.answers().answer_by_id(answer.id).await.unwrap();
        assert_eq!(detached.question_id, None);
        assert_eq!(qa.answers().count_original_answers(11).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replies_cannot_be_resolved_once_their_question_is_gone() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        let answer = qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();
        let reply = qa
            .reply_to_answer(answer.id, 12, "E2", "Use copper.", ReplyKind::Correction)
            .await
            .unwrap();

        qa.delete_question(Actor::Farmer(1), question.id).await.unwrap();
        let err = qa.resolve_reply(Actor::Farmer(1), reply.id, true).await.unwrap_err();
        assert!(matches!(err, QaError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_answer_points_the_expert_at_the_reply_flow() {
        let (qa, _) = orchestrator(None);
        let question = qa.ask_question(1, "F1", "pests", "Fungus on leaves?").await.unwrap();
        qa.answer_question(question.id, 11, "E1", "Use neem oil.").await.unwrap();
        let err = qa.answer_question(question.id, 11, "E1", "Actually…").await.unwrap_err();
        assert!(matches!(err, QaError::DuplicateAnswer { .. }));
    }
}
