//! services/api/src/adapters/answer_llm.rs
//!
//! This module contains the adapter for the AI answer oracle.
//! It implements the `AnswerGenerator` port from the `core` crate.
//!
//! The oracle contract is "a text answer or a sentinel decline"; provider
//! failures are logged and mapped onto the decline so the question simply
//! stays open for human experts.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::warn;

use agriqa_core::ports::{AnswerGenerator, QaResult};

const SYSTEM_INSTRUCTIONS: &str = "You are an agricultural advisor answering a farmer's question. \
Give practical, region-neutral advice in a few short sentences, suitable for a smallholder \
farmer reading on a low-end device. Recommend consulting a local expert for anything requiring \
an in-field diagnosis. IMPORTANT: If you cannot give a useful, safe answer for the question and \
category provided (for example, the question requires local inspection, regulatory advice, or is \
not an agricultural question at all), respond with EXACTLY: 'NO_ANSWER' and nothing else.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerGenerator` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAnswerAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAnswerAdapter {
    /// Creates a new `OpenAiAnswerAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `AnswerGenerator` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerGenerator for OpenAiAnswerAdapter {
    /// Produces a draft answer for a question, or `None` when the model
    /// declines (explicitly via the `NO_ANSWER` sentinel, or effectively
    /// because the provider call failed).
    async fn generate_answer(&self, category: &str, question: &str) -> QaResult<Option<String>> {
        let system = match ChatCompletionRequestSystemMessageArgs::default()
            .content(SYSTEM_INSTRUCTIONS)
            .build()
        {
            Ok(message) => message.into(),
            Err(e) => {
                warn!("failed to build oracle system message: {e}");
                return Ok(None);
            }
        };
        let user = match ChatCompletionRequestUserMessageArgs::default()
            .content(format!("CATEGORY: {category}\n\nQUESTION: {question}"))
            .build()
        {
            Ok(message) => message.into(),
            Err(e) => {
                warn!("failed to build oracle user message: {e}");
                return Ok(None);
            }
        };

        let request = match CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![system, user])
            .n(1)
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                warn!("failed to build oracle request: {e}");
                return Ok(None);
            }
        };

        let response = match self.client.chat().create(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("oracle call failed, question stays open: {e}");
                return Ok(None);
            }
        };

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content);
        match content {
            Some(text) if text.trim() != "NO_ANSWER" && !text.trim().is_empty() => {
                Ok(Some(text.trim().to_string()))
            }
            _ => Ok(None),
        }
    }
}

//=========================================================================================
// Disabled Oracle
//=========================================================================================

/// A stand-in `AnswerGenerator` used when no API key is configured; it
/// declines every question so they stay open for human experts.
pub struct DisabledAnswerAdapter;

#[async_trait]
impl AnswerGenerator for DisabledAnswerAdapter {
    async fn generate_answer(&self, _category: &str, _question: &str) -> QaResult<Option<String>> {
        Ok(None)
    }
}
