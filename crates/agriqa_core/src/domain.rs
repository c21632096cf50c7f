//! crates/agriqa_core/src/domain.rs
//!
//! Defines the pure, core data structures for the community Q&A engine.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};

/// Lifecycle status of a question. A question flips to `Answered` as soon as
/// any answer exists for it, whether expert-authored or AI-generated, and
/// never flips back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Open,
    Answered,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Open => "open",
            QuestionStatus::Answered => "answered",
        }
    }
}

impl std::str::FromStr for QuestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(QuestionStatus::Open),
            "answered" => Ok(QuestionStatus::Answered),
            other => Err(format!("unknown question status '{other}'")),
        }
    }
}

/// A question asked by a farmer.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: i64,
    pub farmer_id: i64,
    pub farmer_name: String,
    pub category: String,
    pub body: String,
    pub status: QuestionStatus,
    /// Text produced by the answer-generator oracle, if one was requested.
    /// AI answers live on the question itself and never enter the
    /// reply/acceptance workflow reserved for expert answers.
    pub ai_answer: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The nature of a reply an expert submits against another expert's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Correction,
    Addition,
    Reply,
}

impl ReplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Correction => "correction",
            ReplyKind::Addition => "addition",
            ReplyKind::Reply => "reply",
        }
    }
}

impl std::str::FromStr for ReplyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correction" => Ok(ReplyKind::Correction),
            "addition" => Ok(ReplyKind::Addition),
            "reply" => Ok(ReplyKind::Reply),
            other => Err(format!("unknown reply kind '{other}'")),
        }
    }
}

/// The asking farmer's verdict on a reply. Original answers stay `Pending`
/// forever; only replies are ever decided, and a decided reply never returns
/// to `Pending` (it may be re-flipped between `Accepted` and `Denied`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acceptance {
    #[default]
    Pending,
    Accepted,
    Denied,
}

impl Acceptance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Acceptance::Pending => "pending",
            Acceptance::Accepted => "accepted",
            Acceptance::Denied => "denied",
        }
    }
}

impl std::str::FromStr for Acceptance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Acceptance::Pending),
            "accepted" => Ok(Acceptance::Accepted),
            "denied" => Ok(Acceptance::Denied),
            other => Err(format!("unknown acceptance state '{other}'")),
        }
    }
}

/// An expert's contribution: either an original answer to a question
/// (`parent_id` is `None`) or a reply to another expert's answer
/// (`parent_id` and `kind` are both set).
///
/// `question_id` is nullable because deleting a question detaches its
/// answers rather than erasing them; an expert's historical contribution
/// survives a farmer's cleanup.
#[derive(Debug, Clone)]
pub struct Answer {
    pub id: i64,
    pub question_id: Option<i64>,
    pub expert_id: i64,
    pub expert_name: String,
    pub body: String,
    pub parent_id: Option<i64>,
    pub kind: Option<ReplyKind>,
    pub acceptance: Acceptance,
    pub created_at: DateTime<Utc>,
}

impl Answer {
    /// True when this row is a reply rather than an original answer.
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// A farmer's rating of an expert's answer. Unique per (farmer, answer):
/// rating the same answer twice overwrites the first score and comment.
#[derive(Debug, Clone)]
pub struct Rating {
    pub id: i64,
    pub expert_id: i64,
    pub farmer_id: i64,
    pub answer_id: i64,
    pub score: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Which side of a conversation authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderKind {
    Farmer,
    Expert,
}

impl SenderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderKind::Farmer => "farmer",
            SenderKind::Expert => "expert",
        }
    }

    /// The opposite side of the conversation.
    pub fn other(&self) -> SenderKind {
        match self {
            SenderKind::Farmer => SenderKind::Expert,
            SenderKind::Expert => SenderKind::Farmer,
        }
    }
}

impl std::str::FromStr for SenderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(SenderKind::Farmer),
            "expert" => Ok(SenderKind::Expert),
            other => Err(format!("unknown sender kind '{other}'")),
        }
    }
}

/// An acting party, replacing the stringly-typed farmer/expert branching of
/// the original product with an exhaustive two-variant union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Farmer(i64),
    Expert(i64),
}

impl Actor {
    pub fn id(&self) -> i64 {
        match *self {
            Actor::Farmer(id) | Actor::Expert(id) => id,
        }
    }

    pub fn kind(&self) -> SenderKind {
        match self {
            Actor::Farmer(_) => SenderKind::Farmer,
            Actor::Expert(_) => SenderKind::Expert,
        }
    }
}

/// The storage-independent parts of a message, handed to the persistence
/// collaborator which assigns the id and sent timestamp.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_key: String,
    pub farmer_id: Option<i64>,
    pub expert_id: i64,
    pub question_id: Option<i64>,
    pub answer_id: Option<i64>,
    pub sender_kind: SenderKind,
    pub sender_name: String,
    pub body: String,
}

/// A single message inside a conversation. `farmer_id` is `None` only for
/// expert-to-expert conversations. Messages are never deleted individually;
/// either participant may delete the whole conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: i64,
    pub conversation_key: String,
    pub farmer_id: Option<i64>,
    pub expert_id: i64,
    pub question_id: Option<i64>,
    pub answer_id: Option<i64>,
    pub sender_kind: SenderKind,
    pub sender_name: String,
    pub body: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}
