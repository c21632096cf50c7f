pub mod answer_llm;
pub mod db;

pub use answer_llm::{DisabledAnswerAdapter, OpenAiAnswerAdapter};
pub use db::PgQaStore;
