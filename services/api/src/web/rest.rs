//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Handlers translate between the
//! wire shapes below and the engine's domain types; every engine error is
//! surfaced with an explicit status, never swallowed into an empty response.

use crate::web::state::AppState;
use agriqa_core::{
    Actor, Answer, ConversationKey, Message, QaError, Question, Rating, ReplyKind, SenderKind,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ask_question_handler,
        list_questions_handler,
        get_question_handler,
        list_farmer_questions_handler,
        delete_question_handler,
        request_ai_answer_handler,
        submit_answer_handler,
        list_answers_handler,
        has_answered_handler,
        submit_reply_handler,
        list_replies_handler,
        resolve_reply_handler,
        rate_answer_handler,
        reputation_handler,
        send_message_handler,
        list_conversations_handler,
        conversation_messages_handler,
        mark_read_handler,
        delete_conversation_handler,
    ),
    components(schemas(
        AskQuestionRequest,
        QuestionResponse,
        AiAnswerResponse,
        SubmitAnswerRequest,
        SubmitReplyRequest,
        AnswerResponse,
        HasAnsweredResponse,
        ResolveReplyRequest,
        RateAnswerRequest,
        RatingResponse,
        ReputationResponse,
        SendMessageRequest,
        MessageResponse,
        MarkReadRequest,
    )),
    tags(
        (name = "Community Q&A API", description = "Questions, expert answers, corrections, ratings and conversations.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AskQuestionRequest {
    pub farmer_id: i64,
    pub farmer_name: String,
    pub category: String,
    pub body: String,
}

#[derive(Serialize, ToSchema)]
pub struct QuestionResponse {
    pub id: i64,
    pub farmer_id: i64,
    pub farmer_name: String,
    pub category: String,
    pub body: String,
    pub status: String,
    pub ai_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Question> for QuestionResponse {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            farmer_id: question.farmer_id,
            farmer_name: question.farmer_name,
            category: question.category,
            body: question.body,
            status: question.status.as_str().to_string(),
            ai_answer: question.ai_answer,
            created_at: question.created_at,
        }
    }
}

/// The outcome of asking the AI oracle; `answer` is null when the oracle
/// declined and the question stayed open.
#[derive(Serialize, ToSchema)]
pub struct AiAnswerResponse {
    pub question_id: i64,
    pub answer: Option<String>,
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    pub expert_id: i64,
    pub expert_name: String,
    pub body: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitReplyRequest {
    pub expert_id: i64,
    pub expert_name: String,
    pub body: String,
    /// One of `correction`, `addition` or `reply`.
    pub kind: String,
}

#[derive(Serialize, ToSchema)]
pub struct AnswerResponse {
    pub id: i64,
    pub question_id: Option<i64>,
    pub expert_id: i64,
    pub expert_name: String,
    pub body: String,
    pub parent_id: Option<i64>,
    pub kind: Option<String>,
    pub acceptance: String,
    pub created_at: DateTime<Utc>,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            expert_id: answer.expert_id,
            expert_name: answer.expert_name,
            body: answer.body,
            parent_id: answer.parent_id,
            kind: answer.kind.map(|k| k.as_str().to_string()),
            acceptance: answer.acceptance.as_str().to_string(),
            created_at: answer.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct HasAnsweredResponse {
    pub question_id: i64,
    pub expert_id: i64,
    pub has_answered: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct ResolveReplyRequest {
    pub farmer_id: i64,
    pub accept: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct RateAnswerRequest {
    pub farmer_id: i64,
    pub score: i16,
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RatingResponse {
    pub id: i64,
    pub expert_id: i64,
    pub farmer_id: i64,
    pub answer_id: i64,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Rating> for RatingResponse {
    fn from(rating: Rating) -> Self {
        Self {
            id: rating.id,
            expert_id: rating.expert_id,
            farmer_id: rating.farmer_id,
            answer_id: rating.answer_id,
            score: rating.score,
            comment: rating.comment,
            created_at: rating.created_at,
        }
    }
}

/// An expert's dashboard snapshot, recomputed on every call.
#[derive(Serialize, ToSchema)]
pub struct ReputationResponse {
    pub expert_id: i64,
    pub average_rating: Option<f64>,
    pub rating_count: u64,
    pub rated_answer_count: u64,
    pub answer_count: u64,
    pub accepted_reply_count: u64,
    pub certificate_eligible: bool,
    pub certificate_threshold: f64,
    /// Display data for a generated certificate; not part of eligibility.
    pub best_rating: Option<RatingResponse>,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// `farmer` or `expert`.
    pub sender_kind: String,
    pub sender_id: i64,
    pub sender_name: String,
    /// `farmer` or `expert`.
    pub recipient_kind: String,
    pub recipient_id: i64,
    pub question_id: Option<i64>,
    /// When set (farmer-expert only), the message lands in the thread
    /// scoped to this answer.
    pub answer_id: Option<i64>,
    pub body: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: i64,
    pub conversation_key: String,
    pub farmer_id: Option<i64>,
    pub expert_id: i64,
    pub question_id: Option<i64>,
    pub answer_id: Option<i64>,
    pub sender_kind: String,
    pub sender_name: String,
    pub body: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            conversation_key: message.conversation_key,
            farmer_id: message.farmer_id,
            expert_id: message.expert_id,
            question_id: message.question_id,
            answer_id: message.answer_id,
            sender_kind: message.sender_kind.as_str().to_string(),
            sender_name: message.sender_name,
            body: message.body,
            read: message.read,
            sent_at: message.sent_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkReadRequest {
    /// `farmer` or `expert` — the side doing the reading.
    pub reader_kind: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ActorParams {
    /// `farmer` or `expert`.
    pub actor_kind: String,
    pub actor_id: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct DeleteQuestionParams {
    pub farmer_id: i64,
}

//=========================================================================================
// Error Translation
//=========================================================================================

type HandlerError = (StatusCode, String);

fn reject(err: QaError) -> HandlerError {
    let status = match &err {
        QaError::DuplicateAnswer { .. } => StatusCode::CONFLICT,
        QaError::UnknownParent(_) | QaError::NotFound(_) => StatusCode::NOT_FOUND,
        QaError::NotAuthorized(_) => StatusCode::FORBIDDEN,
        QaError::InvalidScore(_) => StatusCode::UNPROCESSABLE_ENTITY,
        QaError::StorageUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("request failed: {err}");
    }
    (status, err.to_string())
}

fn bad_request(message: impl Into<String>) -> HandlerError {
    (StatusCode::BAD_REQUEST, message.into())
}

fn parse_actor(kind: &str, id: i64) -> Result<Actor, HandlerError> {
    match kind.parse::<SenderKind>() {
        Ok(SenderKind::Farmer) => Ok(Actor::Farmer(id)),
        Ok(SenderKind::Expert) => Ok(Actor::Expert(id)),
        Err(e) => Err(bad_request(e)),
    }
}

fn parse_key(raw: &str) -> Result<ConversationKey, HandlerError> {
    ConversationKey::parse(raw)
        .ok_or_else(|| bad_request(format!("'{raw}' is not a conversation key")))
}

//=========================================================================================
// Question Handlers
//=========================================================================================

/// Ask a new question. It starts in `open` status.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = AskQuestionRequest,
    responses(
        (status = 201, description = "Question created", body = QuestionResponse),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn ask_question_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AskQuestionRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let question = app_state
        .qa
        .ask_question(
            payload.farmer_id,
            &payload.farmer_name,
            &payload.category,
            &payload.body,
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(QuestionResponse::from(question))))
}

/// List all questions, newest first.
#[utoipa::path(
    get,
    path = "/questions",
    responses(
        (status = 200, description = "All questions", body = [QuestionResponse]),
        (status = 500, description = "Storage unavailable")
    )
)]
pub async fn list_questions_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HandlerError> {
    let questions = app_state.qa.list_questions().await.map_err(reject)?;
    let payload: Vec<QuestionResponse> = questions.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Fetch a single question.
#[utoipa::path(
    get,
    path = "/questions/{question_id}",
    params(("question_id" = i64, Path, description = "The question to fetch")),
    responses(
        (status = 200, description = "The question", body = QuestionResponse),
        (status = 404, description = "No such question")
    )
)]
pub async fn get_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let question = app_state.qa.question(question_id).await.map_err(reject)?;
    Ok(Json(QuestionResponse::from(question)))
}

/// List one farmer's own questions, newest first.
#[utoipa::path(
    get,
    path = "/farmers/{farmer_id}/questions",
    params(("farmer_id" = i64, Path, description = "The asking farmer")),
    responses(
        (status = 200, description = "The farmer's questions", body = [QuestionResponse])
    )
)]
pub async fn list_farmer_questions_handler(
    State(app_state): State<Arc<AppState>>,
    Path(farmer_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let questions = app_state
        .qa
        .questions_for_farmer(farmer_id)
        .await
        .map_err(reject)?;
    let payload: Vec<QuestionResponse> = questions.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Delete a question. Owner only; its answers are detached, not erased.
#[utoipa::path(
    delete,
    path = "/questions/{question_id}",
    params(
        ("question_id" = i64, Path, description = "The question to delete"),
        DeleteQuestionParams
    ),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such question")
    )
)]
pub async fn delete_question_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
    Query(params): Query<DeleteQuestionParams>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state
        .qa
        .delete_question(Actor::Farmer(params.farmer_id), question_id)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Ask the AI oracle to draft an answer for an open question.
#[utoipa::path(
    post,
    path = "/questions/{question_id}/ai-answer",
    params(("question_id" = i64, Path, description = "The question to answer")),
    responses(
        (status = 200, description = "Oracle outcome", body = AiAnswerResponse),
        (status = 404, description = "No such question")
    )
)]
pub async fn request_ai_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let answer = app_state
        .qa
        .request_ai_answer(question_id)
        .await
        .map_err(reject)?;
    let question = app_state.qa.question(question_id).await.map_err(reject)?;
    Ok(Json(AiAnswerResponse {
        question_id,
        answer,
        status: question.status.as_str().to_string(),
    }))
}

//=========================================================================================
// Answer and Reply Handlers
//=========================================================================================

/// Submit an expert's original answer. At most one per expert per question;
/// a second attempt is answered with 409 and the expert should reply to an
/// existing answer instead.
#[utoipa::path(
    post,
    path = "/questions/{question_id}/answers",
    params(("question_id" = i64, Path, description = "The question being answered")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 201, description = "Answer recorded", body = AnswerResponse),
        (status = 404, description = "No such question"),
        (status = 409, description = "Expert already answered this question")
    )
)]
pub async fn submit_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let answer = app_state
        .qa
        .answer_question(
            question_id,
            payload.expert_id,
            &payload.expert_name,
            &payload.body,
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(AnswerResponse::from(answer))))
}

/// List a question's original answers in the order experts responded.
#[utoipa::path(
    get,
    path = "/questions/{question_id}/answers",
    params(("question_id" = i64, Path, description = "The question")),
    responses(
        (status = 200, description = "Original answers, oldest first", body = [AnswerResponse])
    )
)]
pub async fn list_answers_handler(
    State(app_state): State<Arc<AppState>>,
    Path(question_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let answers = app_state
        .qa
        .answers()
        .list_original_answers(question_id)
        .await
        .map_err(reject)?;
    let payload: Vec<AnswerResponse> = answers.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Whether an expert already has an original answer on a question. Replies
/// do not count; this gates the "answer this question" action.
#[utoipa::path(
    get,
    path = "/questions/{question_id}/answers/{expert_id}/exists",
    params(
        ("question_id" = i64, Path, description = "The question"),
        ("expert_id" = i64, Path, description = "The expert")
    ),
    responses(
        (status = 200, description = "Answer-existence flag", body = HasAnsweredResponse)
    )
)]
pub async fn has_answered_handler(
    State(app_state): State<Arc<AppState>>,
    Path((question_id, expert_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, HandlerError> {
    let has_answered = app_state
        .qa
        .answers()
        .has_answered(question_id, expert_id)
        .await
        .map_err(reject)?;
    Ok(Json(HasAnsweredResponse {
        question_id,
        expert_id,
        has_answered,
    }))
}

/// Submit (or re-submit) an expert's reply to another expert's answer.
/// Re-submission updates the existing reply in place.
#[utoipa::path(
    post,
    path = "/answers/{answer_id}/replies",
    params(("answer_id" = i64, Path, description = "The answer being replied to")),
    request_body = SubmitReplyRequest,
    responses(
        (status = 201, description = "Reply recorded", body = AnswerResponse),
        (status = 400, description = "Unknown reply kind"),
        (status = 404, description = "No such parent answer")
    )
)]
pub async fn submit_reply_handler(
    State(app_state): State<Arc<AppState>>,
    Path(answer_id): Path<i64>,
    Json(payload): Json<SubmitReplyRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let kind = payload.kind.parse::<ReplyKind>().map_err(bad_request)?;
    let reply = app_state
        .qa
        .reply_to_answer(
            answer_id,
            payload.expert_id,
            &payload.expert_name,
            &payload.body,
            kind,
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(AnswerResponse::from(reply))))
}

/// List the replies to one answer, oldest first.
#[utoipa::path(
    get,
    path = "/answers/{answer_id}/replies",
    params(("answer_id" = i64, Path, description = "The parent answer")),
    responses(
        (status = 200, description = "Replies, oldest first", body = [AnswerResponse])
    )
)]
pub async fn list_replies_handler(
    State(app_state): State<Arc<AppState>>,
    Path(answer_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let replies = app_state
        .qa
        .answers()
        .list_replies(answer_id)
        .await
        .map_err(reject)?;
    let payload: Vec<AnswerResponse> = replies.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Accept or deny a reply. Only the farmer who owns the question may decide;
/// re-deciding flips the verdict but never reverts it to pending.
#[utoipa::path(
    post,
    path = "/replies/{reply_id}/decision",
    params(("reply_id" = i64, Path, description = "The reply being decided")),
    request_body = ResolveReplyRequest,
    responses(
        (status = 204, description = "Verdict recorded"),
        (status = 403, description = "Not the question owner"),
        (status = 404, description = "No such reply")
    )
)]
pub async fn resolve_reply_handler(
    State(app_state): State<Arc<AppState>>,
    Path(reply_id): Path<i64>,
    Json(payload): Json<ResolveReplyRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    app_state
        .qa
        .resolve_reply(Actor::Farmer(payload.farmer_id), reply_id, payload.accept)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Rating and Reputation Handlers
//=========================================================================================

/// Rate an expert's answer 1-5. One rating per farmer per answer; rating
/// again overwrites the score and comment.
#[utoipa::path(
    post,
    path = "/answers/{answer_id}/ratings",
    params(("answer_id" = i64, Path, description = "The answer being rated")),
    request_body = RateAnswerRequest,
    responses(
        (status = 201, description = "Rating recorded", body = RatingResponse),
        (status = 404, description = "No such answer"),
        (status = 422, description = "Score outside 1..=5")
    )
)]
pub async fn rate_answer_handler(
    State(app_state): State<Arc<AppState>>,
    Path(answer_id): Path<i64>,
    Json(payload): Json<RateAnswerRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let rating = app_state
        .qa
        .rate_answer(
            Actor::Farmer(payload.farmer_id),
            answer_id,
            payload.score,
            payload.comment.as_deref(),
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(RatingResponse::from(rating))))
}

/// An expert's reputation snapshot: averages, counts and certificate
/// eligibility, recomputed from storage on every call.
#[utoipa::path(
    get,
    path = "/experts/{expert_id}/reputation",
    params(("expert_id" = i64, Path, description = "The expert")),
    responses(
        (status = 200, description = "Reputation snapshot", body = ReputationResponse)
    )
)]
pub async fn reputation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(expert_id): Path<i64>,
) -> Result<impl IntoResponse, HandlerError> {
    let summary = app_state
        .reputation
        .summary(expert_id)
        .await
        .map_err(reject)?;
    let best_rating = app_state
        .reputation
        .best_rating_for_certificate(expert_id)
        .await
        .map_err(reject)?;
    Ok(Json(ReputationResponse {
        expert_id: summary.expert_id,
        average_rating: summary.average_rating,
        rating_count: summary.rating_count,
        rated_answer_count: summary.rated_answer_count,
        answer_count: summary.answer_count,
        accepted_reply_count: summary.accepted_reply_count,
        certificate_eligible: summary.certificate_eligible,
        certificate_threshold: app_state.config.certificate_threshold,
        best_rating: best_rating.map(Into::into),
    }))
}

//=========================================================================================
// Conversation Handlers
//=========================================================================================

/// Send a message. The conversation key is derived from the participants;
/// supplying `answer_id` for a farmer-expert pair selects the thread scoped
/// to that answer.
#[utoipa::path(
    post,
    path = "/messages",
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message routed", body = MessageResponse),
        (status = 400, description = "Unknown sender or recipient kind"),
        (status = 404, description = "Referenced answer does not exist")
    )
)]
pub async fn send_message_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let sender = parse_actor(&payload.sender_kind, payload.sender_id)?;
    let recipient = parse_actor(&payload.recipient_kind, payload.recipient_id)?;
    let message = app_state
        .conversations
        .route_message(
            sender,
            &payload.sender_name,
            recipient,
            payload.question_id,
            payload.answer_id,
            &payload.body,
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
}

/// One preview row per conversation the actor participates in, newest first.
#[utoipa::path(
    get,
    path = "/conversations",
    params(ActorParams),
    responses(
        (status = 200, description = "Latest message per conversation", body = [MessageResponse]),
        (status = 400, description = "Unknown actor kind")
    )
)]
pub async fn list_conversations_handler(
    State(app_state): State<Arc<AppState>>,
    Query(params): Query<ActorParams>,
) -> Result<impl IntoResponse, HandlerError> {
    let actor = parse_actor(&params.actor_kind, params.actor_id)?;
    let previews = app_state
        .conversations
        .list_conversations(actor)
        .await
        .map_err(reject)?;
    let payload: Vec<MessageResponse> = previews.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Every message in one conversation, oldest first.
#[utoipa::path(
    get,
    path = "/conversations/{conversation_key}/messages",
    params(("conversation_key" = String, Path, description = "The conversation")),
    responses(
        (status = 200, description = "Messages, oldest first", body = [MessageResponse]),
        (status = 400, description = "Malformed conversation key")
    )
)]
pub async fn conversation_messages_handler(
    State(app_state): State<Arc<AppState>>,
    Path(conversation_key): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = parse_key(&conversation_key)?;
    let messages = app_state
        .conversations
        .conversation_messages(&key)
        .await
        .map_err(reject)?;
    let payload: Vec<MessageResponse> = messages.into_iter().map(Into::into).collect();
    Ok(Json(payload))
}

/// Mark the other side's messages in a conversation as read.
#[utoipa::path(
    post,
    path = "/conversations/{conversation_key}/read",
    params(("conversation_key" = String, Path, description = "The conversation")),
    request_body = MarkReadRequest,
    responses(
        (status = 204, description = "Messages marked read"),
        (status = 400, description = "Malformed key or reader kind")
    )
)]
pub async fn mark_read_handler(
    State(app_state): State<Arc<AppState>>,
    Path(conversation_key): Path<String>,
    Json(payload): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = parse_key(&conversation_key)?;
    let reader = payload.reader_kind.parse::<SenderKind>().map_err(bad_request)?;
    app_state
        .conversations
        .mark_read(&key, reader)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a conversation and every message in it. Irreversible.
#[utoipa::path(
    delete,
    path = "/conversations/{conversation_key}",
    params(("conversation_key" = String, Path, description = "The conversation")),
    responses(
        (status = 204, description = "Conversation deleted"),
        (status = 400, description = "Malformed conversation key")
    )
)]
pub async fn delete_conversation_handler(
    State(app_state): State<Arc<AppState>>,
    Path(conversation_key): Path<String>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = parse_key(&conversation_key)?;
    app_state
        .conversations
        .delete_conversation(&key)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
