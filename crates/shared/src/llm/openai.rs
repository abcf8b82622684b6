use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::models::ChatRole;

use super::gateway::{
    ChatCompletionRequest, ChatCompletionResponse, ChatGateway, ChatGatewayError,
    ChatGatewayFuture, ModelListFuture,
};

/// Model listings are narrowed to chat-capable entries; the hosted
/// catalog mixes in embedding and audio models that cannot serve a chat
/// completion. Per-config override endpoints are unaffected: their model
/// comes from the override itself, not from this listing.
const CHAT_MODEL_ID_FILTER: &str = "gpt";

/// Connection settings for one OpenAI-compatible endpoint. Built once and
/// never mutated; per-config provider overrides get their own gateway
/// value instead of touching the process-wide default.
#[derive(Debug, Clone)]
pub struct OpenAiGatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Error)]
pub enum OpenAiGatewayError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct OpenAiChatGateway {
    client: reqwest::Client,
    config: OpenAiGatewayConfig,
}

impl OpenAiChatGateway {
    pub fn new(config: OpenAiGatewayConfig) -> Result<Self, OpenAiGatewayError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(OpenAiGatewayError::InvalidConfiguration(
                "provider base url must start with http:// or https://".to_string(),
            ));
        }
        if config.api_key.trim().is_empty() {
            return Err(OpenAiGatewayError::InvalidConfiguration(
                "provider api key must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| OpenAiGatewayError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ChatGatewayError> {
        let messages = request
            .messages
            .iter()
            .map(|message| {
                json!({
                    "role": role_to_wire(message.role),
                    "content": message.content,
                })
            })
            .collect::<Vec<_>>();

        let request_body = json!({
            "model": request.model,
            "messages": messages,
            "temperature": decimal_or(&request.params.temperature, 0.7),
            "max_tokens": request.params.max_tokens,
            "top_p": decimal_or(&request.params.top_p, 1.0),
            "frequency_penalty": decimal_or(&request.params.frequency_penalty, 0.0),
            "presence_penalty": decimal_or(&request.params.presence_penalty, 0.0),
        });

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ChatGatewayError::Timeout
                } else {
                    ChatGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            ChatGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            return Err(ChatGatewayError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            )));
        }

        let parsed: ChatSuccessResponse = serde_json::from_str(&body).map_err(|_| {
            ChatGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .first()
            .ok_or_else(|| {
                ChatGatewayError::InvalidProviderPayload("missing_choice".to_string())
            })?
            .message
            .content
            .clone();

        Ok(ChatCompletionResponse {
            content,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            total_tokens: parsed
                .usage
                .and_then(|usage| usage.total_tokens)
                .map(clamp_u64_to_u32)
                .unwrap_or(0),
        })
    }

    async fn fetch_models(&self) -> Result<Vec<String>, ChatGatewayError> {
        let response = self
            .client
            .get(self.endpoint("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ChatGatewayError::Timeout
                } else {
                    ChatGatewayError::ProviderFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            ChatGatewayError::InvalidProviderPayload("response_body_read_failed".to_string())
        })?;

        if !status.is_success() {
            let provider_code = parse_provider_error_code(&body);
            return Err(ChatGatewayError::ProviderFailure(format!(
                "status={} code={provider_code}",
                status.as_u16()
            )));
        }

        let parsed: ModelListResponse = serde_json::from_str(&body).map_err(|_| {
            ChatGatewayError::InvalidProviderPayload("response_json_parse_failed".to_string())
        })?;

        Ok(parsed
            .data
            .into_iter()
            .map(|entry| entry.id)
            .filter(|id| id.contains(CHAT_MODEL_ID_FILTER))
            .collect())
    }
}

impl ChatGateway for OpenAiChatGateway {
    fn chat_completion<'a>(&'a self, request: ChatCompletionRequest) -> ChatGatewayFuture<'a> {
        Box::pin(async move { self.send_chat_completion(&request).await })
    }

    fn list_models<'a>(&'a self) -> ModelListFuture<'a> {
        Box::pin(async move { self.fetch_models().await })
    }
}

#[derive(Debug, Deserialize)]
struct ChatSuccessResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    data: Vec<ModelListEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelListEntry {
    id: String,
}

fn role_to_wire(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "user",
        ChatRole::Assistant => "assistant",
        ChatRole::System => "system",
    }
}

// Stored params are validated at the API boundary; a malformed value that
// still slipped through falls back to the provider default.
fn decimal_or(value: &str, default: f64) -> f64 {
    value.trim().parse::<f64>().unwrap_or(default)
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok();
    let Some(provider_error_code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match provider_error_code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}
