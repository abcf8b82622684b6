use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::models::ChatRole;

pub type ChatGatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ChatCompletionResponse, ChatGatewayError>> + Send + 'a>>;

pub type ModelListFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, ChatGatewayError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Generation parameters travel as decimal strings end to end; they are
/// converted to numbers only at the provider wire boundary.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: String,
    pub max_tokens: i32,
    pub top_p: String,
    pub frequency_penalty: String,
    pub presence_penalty: String,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub params: GenerationParams,
}

#[derive(Debug, Clone)]
pub struct ChatCompletionResponse {
    pub content: String,
    pub model: String,
    pub total_tokens: u32,
}

#[derive(Debug, Error)]
pub enum ChatGatewayError {
    #[error("ai provider request timed out")]
    Timeout,
    #[error("ai provider request failed: {0}")]
    ProviderFailure(String),
    #[error("ai provider returned an invalid payload: {0}")]
    InvalidProviderPayload(String),
}

pub trait ChatGateway: Send + Sync {
    fn chat_completion<'a>(&'a self, request: ChatCompletionRequest) -> ChatGatewayFuture<'a>;

    fn list_models<'a>(&'a self) -> ModelListFuture<'a>;
}
