pub mod answers;
pub mod conversation;
pub mod domain;
pub mod memory;
pub mod orchestrator;
pub mod ports;
pub mod reputation;
pub mod routing;

pub use answers::AnswerStore;
pub use conversation::{ConversationKey, ConversationShape};
pub use domain::{
    Acceptance, Actor, Answer, Message, NewMessage, Question, QuestionStatus, Rating, ReplyKind,
    SenderKind,
};
pub use memory::InMemoryStore;
pub use orchestrator::QaOrchestrator;
pub use ports::{AnswerGenerator, QaError, QaResult, QaStore};
pub use reputation::{ReputationAggregator, ReputationSummary, DEFAULT_CERTIFICATE_THRESHOLD};
pub use routing::ConversationRouter;
