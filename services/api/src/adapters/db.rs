//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `QaStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! The engine's uniqueness invariants are enforced here with partial unique
//! indexes and `INSERT ... ON CONFLICT`, so two concurrent writers can never
//! race a check-then-insert into duplicate rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use agriqa_core::domain::{
    Acceptance, Answer, Message, NewMessage, Question, QuestionStatus, Rating, ReplyKind,
    SenderKind,
};
use agriqa_core::ports::{QaError, QaResult, QaStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `QaStore` port.
#[derive(Clone)]
pub struct PgQaStore {
    pool: PgPool,
}

impl PgQaStore {
    /// Creates a new `PgQaStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a low-level sqlx failure onto the engine's error taxonomy.
fn storage_error(e: sqlx::Error) -> QaError {
    match e {
        sqlx::Error::RowNotFound => QaError::NotFound("row not found".to_string()),
        other => QaError::StorageUnavailable(other.to_string()),
    }
}

/// True when the error is a foreign-key violation (SQLSTATE 23503), i.e. a
/// referenced aggregate is gone.
fn is_fk_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == "23503")
}

fn parse_state<T: std::str::FromStr<Err = String>>(raw: &str) -> QaResult<T> {
    raw.parse()
        .map_err(|e: String| QaError::StorageUnavailable(format!("corrupt stored value: {e}")))
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct QuestionRecord {
    id: i64,
    farmer_id: i64,
    farmer_name: String,
    category: String,
    body: String,
    status: String,
    ai_answer: Option<String>,
    created_at: DateTime<Utc>,
}

impl QuestionRecord {
    fn to_domain(self) -> QaResult<Question> {
        Ok(Question {
            id: self.id,
            farmer_id: self.farmer_id,
            farmer_name: self.farmer_name,
            category: self.category,
            body: self.body,
            status: parse_state::<QuestionStatus>(&self.status)?,
            ai_answer: self.ai_answer,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct AnswerRecord {
    id: i64,
    question_id: Option<i64>,
    expert_id: i64,
    expert_name: String,
    body: String,
    parent_id: Option<i64>,
    kind: Option<String>,
    acceptance: String,
    created_at: DateTime<Utc>,
}

impl AnswerRecord {
    fn to_domain(self) -> QaResult<Answer> {
        let kind = match self.kind {
            Some(raw) => Some(parse_state::<ReplyKind>(&raw)?),
            None => None,
        };
        Ok(Answer {
            id: self.id,
            question_id: self.question_id,
            expert_id: self.expert_id,
            expert_name: self.expert_name,
            body: self.body,
            parent_id: self.parent_id,
            kind,
            acceptance: parse_state::<Acceptance>(&self.acceptance)?,
            created_at: self.created_at,
        })
    }
}

const ANSWER_COLUMNS: &str =
    "id, question_id, expert_id, expert_name, body, parent_id, kind, acceptance, created_at";

#[derive(FromRow)]
struct RatingRecord {
    id: i64,
    expert_id: i64,
    farmer_id: i64,
    answer_id: i64,
    score: i16,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl RatingRecord {
    fn to_domain(self) -> Rating {
        Rating {
            id: self.id,
            expert_id: self.expert_id,
            farmer_id: self.farmer_id,
            answer_id: self.answer_id,
            score: self.score,
            comment: self.comment,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: i64,
    conversation_key: String,
    farmer_id: Option<i64>,
    expert_id: i64,
    question_id: Option<i64>,
    answer_id: Option<i64>,
    sender_kind: String,
    sender_name: String,
    body: String,
    is_read: bool,
    sent_at: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> QaResult<Message> {
        Ok(Message {
            id: self.id,
            conversation_key: self.conversation_key,
            farmer_id: self.farmer_id,
            expert_id: self.expert_id,
            question_id: self.question_id,
            answer_id: self.answer_id,
            sender_kind: parse_state::<SenderKind>(&self.sender_kind)?,
            sender_name: self.sender_name,
            body: self.body,
            read: self.is_read,
            sent_at: self.sent_at,
        })
    }
}

const MESSAGE_COLUMNS: &str = "id, conversation_key, farmer_id, expert_id, question_id, \
     answer_id, sender_kind, sender_name, body, is_read, sent_at";

//=========================================================================================
// `QaStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl QaStore for PgQaStore {
    async fn create_question(
        &self,
        farmer_id: i64,
        farmer_name: &str,
        category: &str,
        body: &str,
    ) -> QaResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "INSERT INTO questions (farmer_id, farmer_name, category, body) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, farmer_id, farmer_name, category, body, status, ai_answer, created_at",
        )
        .bind(farmer_id)
        .bind(farmer_name)
        .bind(category)
        .bind(body)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        record.to_domain()
    }

    async fn question_by_id(&self, question_id: i64) -> QaResult<Question> {
        let record = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, farmer_id, farmer_name, category, body, status, ai_answer, created_at \
             FROM questions WHERE id = $1",
        )
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| QaError::NotFound(format!("question {question_id}")))?;
        record.to_domain()
    }

    async fn list_questions(&self) -> QaResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, farmer_id, farmer_name, category, body, status, ai_answer, created_at \
             FROM questions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn questions_by_farmer(&self, farmer_id: i64) -> QaResult<Vec<Question>> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            "SELECT id, farmer_id, farmer_name, category, body, status, ai_answer, created_at \
             FROM questions WHERE farmer_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(farmer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        records.into_iter().map(QuestionRecord::to_domain).collect()
    }

    async fn set_question_status(&self, question_id: i64, status: QuestionStatus) -> QaResult<()> {
        let result = sqlx::query("UPDATE questions SET status = $2 WHERE id = $1")
            .bind(question_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(QaError::NotFound(format!("question {question_id}")));
        }
        Ok(())
    }

    async fn record_ai_answer(&self, question_id: i64, answer_text: &str) -> QaResult<()> {
        let result = sqlx::query(
            "UPDATE questions SET ai_answer = $2, status = 'answered' WHERE id = $1",
        )
        .bind(question_id)
        .bind(answer_text)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(QaError::NotFound(format!("question {question_id}")));
        }
        Ok(())
    }

    async fn delete_question(&self, question_id: i64) -> QaResult<()> {
        // Detach the direct answers first so they survive the delete;
        // both steps commit together.
        let mut tx = self.pool.begin().await.map_err(storage_error)?;
        sqlx::query("UPDATE answers SET question_id = NULL WHERE question_id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(QaError::NotFound(format!("question {question_id}")));
        }
        tx.commit().await.map_err(storage_error)?;
        Ok(())
    }

    async fn insert_original_answer(
        &self,
        question_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
    ) -> QaResult<Answer> {
        // The partial unique index on (question_id, expert_id) where
        // parent_id is null makes this atomic; a losing concurrent insert
        // simply returns no row.
        let query = format!(
            "INSERT INTO answers (question_id, expert_id, expert_name, body) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (question_id, expert_id) WHERE parent_id IS NULL DO NOTHING \
             RETURNING {ANSWER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(question_id)
            .bind(expert_id)
            .bind(expert_name)
            .bind(body)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_fk_violation(&e) {
                    QaError::NotFound(format!("question {question_id}"))
                } else {
                    storage_error(e)
                }
            })?;
        match record {
            Some(record) => record.to_domain(),
            None => Err(QaError::DuplicateAnswer {
                question_id,
                expert_id,
            }),
        }
    }

    async fn upsert_reply(
        &self,
        parent_id: i64,
        expert_id: i64,
        expert_name: &str,
        body: &str,
        kind: ReplyKind,
    ) -> QaResult<Answer> {
        // Insert-select keyed on the parent row: a missing parent yields no
        // row, a re-submission hits the partial unique index and updates the
        // existing reply in place.
        let query = format!(
            "INSERT INTO answers (question_id, expert_id, expert_name, body, parent_id, kind) \
             SELECT parent.question_id, $2, $3, $4, parent.id, $5 \
             FROM answers parent WHERE parent.id = $1 \
             ON CONFLICT (parent_id, expert_id) WHERE parent_id IS NOT NULL \
             DO UPDATE SET body = EXCLUDED.body, kind = EXCLUDED.kind, \
                           expert_name = EXCLUDED.expert_name, created_at = now() \
             RETURNING {ANSWER_COLUMNS}"
        );
        let record = sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(parent_id)
            .bind(expert_id)
            .bind(expert_name)
            .bind(body)
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        match record {
            Some(record) => record.to_domain(),
            None => Err(QaError::UnknownParent(parent_id)),
        }
    }

    async fn answer_by_id(&self, answer_id: i64) -> QaResult<Answer> {
        let query = format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE id = $1");
        let record = sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(answer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| QaError::NotFound(format!("answer {answer_id}")))?;
        record.to_domain()
    }

    async fn set_acceptance(&self, answer_id: i64, acceptance: Acceptance) -> QaResult<()> {
        let result = sqlx::query("UPDATE answers SET acceptance = $2 WHERE id = $1")
            .bind(answer_id)
            .bind(acceptance.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(QaError::NotFound(format!("answer {answer_id}")));
        }
        Ok(())
    }

    async fn original_answers_for_question(&self, question_id: i64) -> QaResult<Vec<Answer>> {
        let query = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers \
             WHERE question_id = $1 AND parent_id IS NULL \
             ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(question_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        records.into_iter().map(AnswerRecord::to_domain).collect()
    }

    async fn replies_for_answer(&self, parent_id: i64) -> QaResult<Vec<Answer>> {
        let query = format!(
            "SELECT {ANSWER_COLUMNS} FROM answers \
             WHERE parent_id = $1 ORDER BY created_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, AnswerRecord>(&query)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        records.into_iter().map(AnswerRecord::to_domain).collect()
    }

    async fn has_answered(&self, question_id: i64, expert_id: i64) -> QaResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM answers \
                 WHERE question_id = $1 AND expert_id = $2 AND parent_id IS NULL \
             )",
        )
        .bind(question_id)
        .bind(expert_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)
    }

    async fn count_original_answers(&self, expert_id: i64) -> QaResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM answers WHERE expert_id = $1 AND parent_id IS NULL",
        )
        .bind(expert_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(count as u64)
    }

    async fn count_accepted_replies(&self, expert_id: i64) -> QaResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM answers \
             WHERE expert_id = $1 AND parent_id IS NOT NULL AND acceptance = 'accepted'",
        )
        .bind(expert_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(count as u64)
    }

    async fn upsert_rating(
        &self,
        farmer_id: i64,
        expert_id: i64,
        answer_id: i64,
        score: i16,
        comment: Option<&str>,
    ) -> QaResult<Rating> {
        let record = sqlx::query_as::<_, RatingRecord>(
            "INSERT INTO ratings (farmer_id, expert_id, answer_id, score, comment) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (farmer_id, answer_id) \
             DO UPDATE SET score = EXCLUDED.score, comment = EXCLUDED.comment, \
                           created_at = now() \
             RETURNING id, expert_id, farmer_id, answer_id, score, comment, created_at",
        )
        .bind(farmer_id)
        .bind(expert_id)
        .bind(answer_id)
        .bind(score)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e) {
                QaError::NotFound(format!("answer {answer_id}"))
            } else {
                storage_error(e)
            }
        })?;
        Ok(record.to_domain())
    }

    async fn ratings_for_expert(&self, expert_id: i64) -> QaResult<Vec<Rating>> {
        let records = sqlx::query_as::<_, RatingRecord>(
            "SELECT id, expert_id, farmer_id, answer_id, score, comment, created_at \
             FROM ratings WHERE expert_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(expert_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(records.into_iter().map(RatingRecord::to_domain).collect())
    }

    async fn append_message(&self, message: NewMessage) -> QaResult<Message> {
        let query = format!(
            "INSERT INTO messages (conversation_key, farmer_id, expert_id, question_id, \
                                   answer_id, sender_kind, sender_name, body) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {MESSAGE_COLUMNS}"
        );
        let record = sqlx::query_as::<_, MessageRecord>(&query)
            .bind(&message.conversation_key)
            .bind(message.farmer_id)
            .bind(message.expert_id)
            .bind(message.question_id)
            .bind(message.answer_id)
            .bind(message.sender_kind.as_str())
            .bind(&message.sender_name)
            .bind(&message.body)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_error)?;
        record.to_domain()
    }

    async fn conversation_messages(&self, conversation_key: &str) -> QaResult<Vec<Message>> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages \
             WHERE conversation_key = $1 ORDER BY sent_at ASC, id ASC"
        );
        let records = sqlx::query_as::<_, MessageRecord>(&query)
            .bind(conversation_key)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        records.into_iter().map(MessageRecord::to_domain).collect()
    }

    async fn conversation_previews(&self) -> QaResult<Vec<Message>> {
        let query = format!(
            "SELECT DISTINCT ON (conversation_key) {MESSAGE_COLUMNS} FROM messages \
             ORDER BY conversation_key, sent_at DESC, id DESC"
        );
        let records = sqlx::query_as::<_, MessageRecord>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        records.into_iter().map(MessageRecord::to_domain).collect()
    }

    async fn mark_conversation_read(
        &self,
        conversation_key: &str,
        authored_by: SenderKind,
    ) -> QaResult<()> {
        sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE conversation_key = $1 AND sender_kind = $2",
        )
        .bind(conversation_key)
        .bind(authored_by.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn delete_conversation(&self, conversation_key: &str) -> QaResult<()> {
        sqlx::query("DELETE FROM messages WHERE conversation_key = $1")
            .bind(conversation_key)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }
}
