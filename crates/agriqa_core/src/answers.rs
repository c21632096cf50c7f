//! crates/agriqa_core/src/answers.rs
//!
//! The answer store: owns the question -> answer -> reply tree and the
//! accept/deny state of replies. Uniqueness invariants (one original answer
//! per (question, expert), one reply per (parent, expert)) are enforced
//! atomically by the persistence collaborator; this component is the typed
//! surface the orchestrator and router work against.

use std::sync::Arc;

use tracing::info;

use crate::domain::{Acceptance, Answer, ReplyKind};
use crate::ports::{QaResult, QaStore};

#[derive(Clone)]
pub struct AnswerStore {
    store: Arc<dyn QaStore>,
}

impl AnswerStore {
    pub fn new(store: Arc<dyn QaStore>) -> Self {
        Self { store }
    }

    /// Submits an expert's original answer to a question. Fails with
    /// `DuplicateAnswer` when the expert already answered it; the expert
    /// should submit a reply to an existing answer instead.
    pub async fn submit_answer(
        &self,
        question_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
    ) -> QaResult<Answer> {
        let answer = self
            .store
            .insert_original_answer(question_id, expert_id, expert_name, body)
            .await?;
        info!(question_id, expert_id, answer_id = answer.id, "original answer submitted");
        Ok(answer)
    }

    /// Submits an expert's reply (correction/addition/comment) against
    /// another expert's answer. Re-submitting against the same parent updates
    /// the existing reply in place rather than creating a duplicate.
    pub async fn submit_reply(
        &self,
        parent_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
        kind: ReplyKind,
    ) -> QaResult<Answer> {
        let reply = self
            .store
            .upsert_reply(parent_id, expert_id, expert_name, body, kind)
            .await?;
        info!(
            parent_id,
            expert_id,
            reply_id = reply.id,
            kind = kind.as_str(),
            "reply submitted"
        );
        Ok(reply)
    }

    /// Records the asking farmer's verdict on a reply. Idempotent: deciding
    /// again simply overwrites the flag. A decided reply never returns to
    /// pending. Ownership checks belong to the orchestrator.
    pub async fn decide(&self, reply_id: i64, accepted: bool) -> QaResult<()> {
        let acceptance = if accepted {
            Acceptance::Accepted
        } else {
            Acceptance::Denied
        };
        self.store.set_acceptance(reply_id, acceptance).await?;
        info!(reply_id, acceptance = acceptance.as_str(), "reply decided");
        Ok(())
    }

    /// Original answers in the order experts responded.
    pub async fn list_original_answers(&self, question_id: i64) -> QaResult<Vec<Answer>> {
        self.store.original_answers_for_question(question_id).await
    }

    /// Replies to one answer, submission order ascending.
    pub async fn list_replies(&self, parent_id: i64) -> QaResult<Vec<Answer>> {
        self.store.replies_for_answer(parent_id).await
    }

    /// True iff the expert has an original answer on the question. Replies
    /// are ignored; an expert who only replied may still answer.
    pub async fn has_answered(&self, question_id: i64, expert_id: i64) -> QaResult<bool> {
        self.store.has_answered(question_id, expert_id).await
    }

    /// Distinct original answers by the expert across all questions,
    /// including answers whose question was later deleted.
    pub async fn count_original_answers(&self, expert_id: i64) -> QaResult<u64> {
        self.store.count_original_answers(expert_id).await
    }

    /// Replies by the expert that the asking farmer accepted.
    pub async fn count_accepted_replies(&self, expert_id: i64) -> QaResult<u64> {
        self.store.count_accepted_replies(expert_id).await
    }

    pub async fn answer_by_id(&self, answer_id: i64) -> QaResult<Answer> {
        self.store.answer_by_id(answer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::ports::QaError;

    async fn store_with_question() -> (AnswerStore, i64) {
        let backing = Arc::new(InMemoryStore::new());
        let question = backing
            .create_question(1, "Asha", "pests", "Leaves are curling, what do I do?")
            .await
            .unwrap();
        (AnswerStore::new(backing), question.id)
    }

    #[tokio::test]
    async fn second_original_answer_by_same_expert_is_rejected() {
        let (answers, question_id) = store_with_question().await;
        answers
            .submit_answer(question_id, 7, "Dr. Rao", "Use neem oil.")
            .await
            .unwrap();
        let err = answers
            .submit_answer(question_id, 7, "Dr. Rao", "Second thoughts.")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            QaError::DuplicateAnswer { expert_id: 7, .. }
        ));

        let listed = answers.list_original_answers(question_id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_original_answers_leave_exactly_one_row() {
        let (answers, question_id) = store_with_question().await;
        let a = answers.clone();
        let b = answers.clone();
        let first =
            tokio::spawn(async move { a.submit_answer(question_id, 7, "Dr. Rao", "A").await });
        let second =
            tokio::spawn(async move { b.submit_answer(question_id, 7, "Dr. Rao", "B").await });
        let results = [first.await.unwrap(), second.await.unwrap()];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(QaError::DuplicateAnswer { .. })))
            .count();
        assert_eq!((successes, duplicates), (1, 1));
        assert_eq!(
            answers.list_original_answers(question_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn resubmitted_reply_updates_in_place() {
        let (answers, question_id) = store_with_question().await;
        let original = answers
            .submit_answer(question_id, 7, "Dr. Rao", "Use neem oil.")
            .await
            .unwrap();

        let first = answers
            .submit_reply(original.id, 9, "Dr. Iyer", "Add sticky traps.", ReplyKind::Addition)
            .await
            .unwrap();
        let second = answers
            .submit_reply(
                original.id,
                9,
                "Dr. Iyer",
                "Use copper fungicide instead.",
                ReplyKind::Correction,
            )
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        let replies = answers.list_replies(original.id).await.unwrap();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].body, "Use copper fungicide instead.");
        assert_eq!(replies[0].kind, Some(ReplyKind::Correction));
    }

    #[tokio::test]
    async fn reply_to_missing_parent_is_unknown_parent() {
        let (answers, _) = store_with_question().await;
        let err = answers
            .submit_reply(999, 9, "Dr. Iyer", "…", ReplyKind::Reply)
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::UnknownParent(999)));
    }

    #[tokio::test]
    async fn has_answered_ignores_replies() {
        let (answers, question_id) = store_with_question().await;
        let original = answers
            .submit_answer(question_id, 7, "Dr. Rao", "Use neem oil.")
            .await
            .unwrap();
        answers
            .submit_reply(original.id, 9, "Dr. Iyer", "Agreed.", ReplyKind::Reply)
            .await
            .unwrap();

        assert!(answers.has_answered(question_id, 7).await.unwrap());
        assert!(!answers.has_answered(question_id, 9).await.unwrap());
    }

    #[tokio::test]
    async fn only_accepted_replies_count() {
        let (answers, question_id) = store_with_question().await;
        let original = answers
            .submit_answer(question_id, 7, "Dr. Rao", "Use neem oil.")
            .await
            .unwrap();
        let reply = answers
            .submit_reply(
                original.id,
                9,
                "Dr. Iyer",
                "Use copper fungicide instead.",
                ReplyKind::Correction,
            )
            .await
            .unwrap();

        assert_eq!(answers.count_accepted_replies(9).await.unwrap(), 0);
        answers.decide(reply.id, false).await.unwrap();
        assert_eq!(answers.count_accepted_replies(9).await.unwrap(), 0);
        answers.decide(reply.id, true).await.unwrap();
        assert_eq!(answers.count_accepted_replies(9).await.unwrap(), 1);
        // The original author never gains accepted replies from this.
        assert_eq!(answers.count_accepted_replies(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn original_answer_counts_survive_question_deletion() {
        let backing = Arc::new(InMemoryStore::new());
        let answers = AnswerStore::new(backing.clone());
        let question = backing
            .create_question(1, "Asha", "soil", "Which fertilizer for paddy?")
            .await
            .unwrap();
        answers
            .submit_answer(question.id, 7, "Dr. Rao", "Urea in split doses.")
            .await
            .unwrap();

        backing.delete_question(question.id).await.unwrap();
        assert_eq!(answers.count_original_answers(7).await.unwrap(), 1);
    }
}
