use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::study_plan::StudyPlan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// Per-config provider endpoint override. The API key is redacted from
/// `Debug` output so it can never leak through logging.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOverride {
    #[serde(default)]
    pub vendor_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl fmt::Debug for ProviderOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderOverride")
            .field("vendor_url", &self.vendor_url)
            .field("has_api_key", &self.api_key.is_some())
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderOverrideSummary {
    pub vendor_url: Option<String>,
    pub has_api_key: bool,
    pub model: Option<String>,
}

impl ProviderOverrideSummary {
    pub fn from_override(value: &ProviderOverride) -> Self {
        Self {
            vendor_url: value.vendor_url.clone(),
            has_api_key: value.api_key.as_deref().is_some_and(|key| !key.is_empty()),
            model: value.model.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfigDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub system_prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default = "default_top_p")]
    pub top_p: String,
    #[serde(default = "default_penalty")]
    pub frequency_penalty: String,
    #[serde(default = "default_penalty")]
    pub presence_penalty: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub provider_override: Option<ProviderOverride>,
}

/// Partial update. Plain optional fields mean "unchanged" when absent.
/// `description` and `provider_override` are nullable columns, so they
/// distinguish absent (unchanged) from explicit `null` (cleared) via the
/// nested `Option`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfigPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
    #[serde(default)]
    pub top_p: Option<String>,
    #[serde(default)]
    pub frequency_penalty: Option<String>,
    #[serde(default)]
    pub presence_penalty: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub provider_override: Option<Option<ProviderOverride>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfigResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: String,
    pub model: String,
    pub temperature: String,
    pub max_tokens: i32,
    pub top_p: String,
    pub frequency_penalty: String,
    pub presence_penalty: String,
    pub icon: String,
    pub is_default: bool,
    pub is_active: bool,
    pub provider_override: Option<ProviderOverrideSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub assistant_config_id: Option<Uuid>,
    #[serde(default = "default_true")]
    pub use_knowledge_base: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    pub session_id: String,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnResponse {
    pub id: Uuid,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub tokens_used: i32,
    pub model: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionListResponse {
    pub sessions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlanRequest {
    pub prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyPlanStatus {
    Success,
    ParseError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPlanResponse {
    pub status: StudyPlanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<StudyPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Deserializes a present field (including explicit `null`) as
/// `Some(inner)`; combined with `#[serde(default)]`, an absent field stays
/// `None`, preserving the absent-vs-null distinction.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> String {
    "0.7".to_string()
}

fn default_max_tokens() -> i32 {
    2000
}

fn default_top_p() -> String {
    "1".to_string()
}

fn default_penalty() -> String {
    "0".to_string()
}

fn default_icon() -> String {
    "🤖".to_string()
}

fn default_true() -> bool {
    true
}
