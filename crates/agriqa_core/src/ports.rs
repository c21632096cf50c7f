//! crates/agriqa_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the engine's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! engine to be independent of specific external implementations like
//! databases or LLM providers.

use async_trait::async_trait;

use crate::domain::{
    Acceptance, Answer, Message, NewMessage, Question, QuestionStatus, Rating, ReplyKind,
    SenderKind,
};

//=========================================================================================
// Engine Error and Result Types
//=========================================================================================

/// The error taxonomy shared by every engine operation. All errors are
/// returned as explicit result values; a storage failure is never papered
/// over with cached or partial data.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// The expert already has an original answer on this question. Recovered
    /// locally by instructing the caller to submit a reply instead.
    #[error("expert {expert_id} already has an original answer on question {question_id}")]
    DuplicateAnswer { question_id: i64, expert_id: i64 },

    /// A reply targets an answer that does not exist (it may have been
    /// concurrently deleted).
    #[error("parent answer {0} does not exist")]
    UnknownParent(i64),

    /// An actor attempted an operation on a resource they do not own.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// A rating score outside the 1..=5 range, rejected before it reaches
    /// storage.
    #[error("rating score {0} is outside the valid range 1..=5")]
    InvalidScore(i16),

    /// A referenced aggregate does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The persistence collaborator failed. Propagated unchanged; retry
    /// policy belongs to the caller.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// A convenience type alias for `Result<T, QaError>`.
pub type QaResult<T> = Result<T, QaError>;

//=========================================================================================
// Persistence Port
//=========================================================================================

/// The persistence collaborator. Implementations must make the uniqueness
/// invariants atomic: one original answer per (question, expert), one reply
/// per (parent, expert) and one rating per (farmer, answer) must each be a
/// single insert-or-update, never a read followed by a write.
#[async_trait]
pub trait QaStore: Send + Sync {
    // --- Questions ---
    async fn create_question(
        &self,
        farmer_id: i64,
        farmer_name: &str,
        category: &str,
        body: &str,
    ) -> QaResult<Question>;

    async fn question_by_id(&self, question_id: i64) -> QaResult<Question>;

    /// All questions, newest first.
    async fn list_questions(&self) -> QaResult<Vec<Question>>;

    /// One farmer's questions, newest first.
    async fn questions_by_farmer(&self, farmer_id: i64) -> QaResult<Vec<Question>>;

    async fn set_question_status(&self, question_id: i64, status: QuestionStatus) -> QaResult<()>;

    /// Stores the oracle's answer text and flips the question to `Answered`
    /// in one update.
    async fn record_ai_answer(&self, question_id: i64, answer_text: &str) -> QaResult<()>;

    /// Deletes the question row and detaches its direct answers by clearing
    /// their question reference. Detached answers keep counting toward their
    /// author's reputation.
    async fn delete_question(&self, question_id: i64) -> QaResult<()>;

    // --- Answers ---
    /// Inserts an original answer, failing with `DuplicateAnswer` when the
    /// expert already has one on this question.
    async fn insert_original_answer(
        &self,
        question_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
    ) -> QaResult<Answer>;

    /// Inserts the expert's reply against `parent_id`, or updates the
    /// existing one's body, kind and timestamp in place. Fails with
    /// `UnknownParent` when the parent answer does not exist.
    async fn upsert_reply(
        &self,
        parent_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
        kind: ReplyKind,
    ) -> QaResult<Answer>;

    async fn answer_by_id(&self, answer_id: i64) -> QaResult<Answer>;

    /// Overwrites the acceptance flag. Idempotent.
    async fn set_acceptance(&self, answer_id: i64, acceptance: Acceptance) -> QaResult<()>;

    /// Original answers for a question, submission order ascending.
    async fn original_answers_for_question(&self, question_id: i64) -> QaResult<Vec<Answer>>;

    /// Replies to an answer, submission order ascending.
    async fn replies_for_answer(&self, parent_id: i64) -> QaResult<Vec<Answer>>;

    async fn has_answered(&self, question_id: i64, expert_id: i64) -> QaResult<bool>;

    /// Total original answers by an expert, including answers whose question
    /// was later deleted.
    async fn count_original_answers(&self, expert_id: i64) -> QaResult<u64>;

    /// This expert's replies with acceptance = accepted. Denied or pending
    /// replies never count.
    async fn count_accepted_replies(&self, expert_id: i64) -> QaResult<u64>;

    // --- Ratings ---
    /// Inserts the farmer's rating of an answer, or overwrites the score and
    /// comment of the existing one.
    async fn upsert_rating(
        &self,
        farmer_id: i64,
        expert_id: i64,
        answer_id: i64,
        score: i16,
        comment: Option<&str>,
    ) -> QaResult<Rating>;

    async fn ratings_for_expert(&self, expert_id: i64) -> QaResult<Vec<Rating>>;

    // --- Messages ---
    async fn append_message(&self, message: NewMessage) -> QaResult<Message>;

    /// Every message under a conversation key, sent timestamp ascending with
    /// ties broken by id (insertion order).
    async fn conversation_messages(&self, conversation_key: &str) -> QaResult<Vec<Message>>;

    /// The most recent message of every distinct conversation, for preview
    /// scans.
    async fn conversation_previews(&self) -> QaResult<Vec<Message>>;

    /// Marks every message in the conversation authored by `authored_by` as
    /// read.
    async fn mark_conversation_read(
        &self,
        conversation_key: &str,
        authored_by: SenderKind,
    ) -> QaResult<()>;

    /// Removes every message under the key. Irreversible; no tombstones.
    async fn delete_conversation(&self, conversation_key: &str) -> QaResult<()>;
}

//=========================================================================================
// Answer Generator Port
//=========================================================================================

/// The opaque text-producing oracle used for AI answers. `Ok(None)` is the
/// sentinel for "the oracle declined"; the question then stays open.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate_answer(&self, category: &str, question: &str) -> QaResult<Option<String>>;
}
