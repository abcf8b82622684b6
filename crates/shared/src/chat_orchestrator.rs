use std::sync::Arc;

use chrono::{Duration, NaiveTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::knowledge::{
    KnowledgeSources, MAX_DIARY_ENTRIES, MAX_FAVORITES, MAX_GOALS, MAX_TODAY_ITEMS,
    MAX_UPCOMING_ITEMS, assemble_knowledge_context,
};
use crate::llm::gateway::{
    ChatCompletionRequest, ChatGateway, ChatGatewayError, ChatMessage, GenerationParams,
};
use crate::llm::openai::{OpenAiChatGateway, OpenAiGatewayConfig};
use crate::llm::prompts::{STUDY_PLAN_SYSTEM_PROMPT, compose_system_prompt};
use crate::models::ChatRole;
use crate::repos::{AssistantConfigRecord, NewChatTurn, Store, StoreError};
use crate::study_plan::{StudyPlanOutcome, parse_study_plan};

/// History window for one turn, independent of the knowledge-context cap.
pub const HISTORY_WINDOW_TURNS: i64 = 20;

#[derive(Debug, Clone)]
pub struct ChatTurnInput {
    pub message: String,
    pub session_id: Option<String>,
    pub config_id: Option<Uuid>,
    pub use_knowledge: bool,
}

#[derive(Debug, Clone)]
pub struct ChatTurnOutcome {
    pub message: String,
    pub session_id: String,
    pub tokens_used: u32,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("assistant config not found")]
    ConfigNotFound,
    #[error("no default assistant config")]
    NoDefaultConfig,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to build provider client: {0}")]
    ProviderClient(String),
    #[error(transparent)]
    Provider(#[from] ChatGatewayError),
}

#[derive(Debug, Clone, Copy)]
enum TurnKind {
    Chat,
    StudyPlan,
}

#[derive(Clone)]
pub struct ChatOrchestrator {
    store: Store,
    chat_gateway: Arc<dyn ChatGateway>,
    plan_gateway: Arc<dyn ChatGateway>,
    chat_timeout_ms: u64,
    plan_timeout_ms: u64,
}

impl ChatOrchestrator {
    pub fn new(
        store: Store,
        chat_gateway: Arc<dyn ChatGateway>,
        plan_gateway: Arc<dyn ChatGateway>,
        chat_timeout_ms: u64,
        plan_timeout_ms: u64,
    ) -> Self {
        Self {
            store,
            chat_gateway,
            plan_gateway,
            chat_timeout_ms,
            plan_timeout_ms,
        }
    }

    /// Executes one conversational turn: resolve the config, persist the
    /// user turn, call the provider, persist the reply.
    pub async fn run_turn(
        &self,
        user_id: Uuid,
        input: ChatTurnInput,
    ) -> Result<ChatTurnOutcome, ChatError> {
        self.execute_turn(user_id, input, TurnKind::Chat).await
    }

    /// Same orchestration path as [`run_turn`](Self::run_turn), but with
    /// the study-plan instruction as system prompt, a fresh session, no
    /// knowledge injection, and the extended generation timeout. Parse
    /// failures degrade to [`StudyPlanOutcome::ParseError`], never to a
    /// hard error.
    pub async fn generate_study_plan(
        &self,
        user_id: Uuid,
        prompt: &str,
    ) -> Result<StudyPlanOutcome, ChatError> {
        let input = ChatTurnInput {
            message: prompt.to_string(),
            session_id: None,
            config_id: None,
            use_knowledge: false,
        };
        let outcome = self
            .execute_turn(user_id, input, TurnKind::StudyPlan)
            .await?;
        Ok(parse_study_plan(
            &outcome.message,
            outcome.tokens_used,
            &outcome.model,
        ))
    }

    async fn execute_turn(
        &self,
        user_id: Uuid,
        input: ChatTurnInput,
        kind: TurnKind,
    ) -> Result<ChatTurnOutcome, ChatError> {
        let config = self.resolve_config(user_id, input.config_id).await?;

        let session_id = input
            .session_id
            .filter(|session_id| !session_id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Durable before the provider call: on failure the prompt remains
        // visible as a turn without a reply.
        self.store
            .insert_chat_turn(NewChatTurn {
                user_id,
                session_id: &session_id,
                assistant_config_id: Some(config.id),
                role: ChatRole::User,
                content: &input.message,
                tokens_used: 0,
                model: None,
            })
            .await?;

        let history = self
            .store
            .recent_session_turns(user_id, &session_id, HISTORY_WINDOW_TURNS)
            .await?;

        let knowledge_context = if input.use_knowledge {
            self.gather_knowledge_context(user_id).await
        } else {
            String::new()
        };

        let base_prompt = match kind {
            TurnKind::Chat => config.system_prompt.as_str(),
            TurnKind::StudyPlan => STUDY_PLAN_SYSTEM_PROMPT,
        };
        let system_prompt = compose_system_prompt(base_prompt, &knowledge_context);

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(ChatMessage::new(ChatRole::System, system_prompt));
        messages.extend(
            history
                .iter()
                .map(|turn| ChatMessage::new(turn.role, turn.content.clone())),
        );

        let gateway = self.resolve_gateway(&config, kind)?;
        let model = request_model(&config);
        debug!(
            user_id = %user_id,
            session_id = %session_id,
            model = %model,
            history_turns = history.len(),
            "dispatching chat completion"
        );

        let response = gateway
            .chat_completion(ChatCompletionRequest {
                model,
                messages,
                params: GenerationParams {
                    temperature: config.temperature.clone(),
                    max_tokens: config.max_tokens,
                    top_p: config.top_p.clone(),
                    frequency_penalty: config.frequency_penalty.clone(),
                    presence_penalty: config.presence_penalty.clone(),
                },
            })
            .await?;

        self.store
            .insert_chat_turn(NewChatTurn {
                user_id,
                session_id: &session_id,
                assistant_config_id: Some(config.id),
                role: ChatRole::Assistant,
                content: &response.content,
                tokens_used: i32::try_from(response.total_tokens).unwrap_or(i32::MAX),
                model: Some(&response.model),
            })
            .await?;

        Ok(ChatTurnOutcome {
            message: response.content,
            session_id,
            tokens_used: response.total_tokens,
            model: response.model,
        })
    }

    async fn resolve_config(
        &self,
        user_id: Uuid,
        config_id: Option<Uuid>,
    ) -> Result<AssistantConfigRecord, ChatError> {
        match config_id {
            Some(config_id) => match self.store.get_assistant_config(user_id, config_id).await {
                Ok(config) => Ok(config),
                Err(StoreError::NotFound) => Err(ChatError::ConfigNotFound),
                Err(err) => Err(err.into()),
            },
            None => self
                .store
                .get_default_assistant_config(user_id)
                .await?
                .ok_or(ChatError::NoDefaultConfig),
        }
    }

    fn resolve_gateway(
        &self,
        config: &AssistantConfigRecord,
        kind: TurnKind,
    ) -> Result<Arc<dyn ChatGateway>, ChatError> {
        let Some((vendor_url, api_key)) = override_endpoint(config) else {
            return Ok(match kind {
                TurnKind::Chat => self.chat_gateway.clone(),
                TurnKind::StudyPlan => self.plan_gateway.clone(),
            });
        };

        // Key presence only; the key itself must never reach the logs.
        debug!(
            config_id = %config.id,
            vendor_url = %vendor_url,
            has_api_key = true,
            "using per-config provider override"
        );

        let timeout_ms = match kind {
            TurnKind::Chat => self.chat_timeout_ms,
            TurnKind::StudyPlan => self.plan_timeout_ms,
        };
        let gateway = OpenAiChatGateway::new(OpenAiGatewayConfig {
            base_url: vendor_url,
            api_key,
            timeout_ms,
        })
        .map_err(|err| ChatError::ProviderClient(err.to_string()))?;

        Ok(Arc::new(gateway))
    }

    async fn gather_knowledge_context(&self, user_id: Uuid) -> String {
        match self.try_gather_knowledge(user_id).await {
            Ok(context) => context,
            Err(err) => {
                // Personalization is best-effort; a chat turn must not
                // fail because a context source did.
                warn!(user_id = %user_id, "knowledge context gathering failed: {err}");
                String::new()
            }
        }
    }

    async fn try_gather_knowledge(&self, user_id: Uuid) -> Result<String, StoreError> {
        let today_start = Utc::now()
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let tomorrow_start = today_start + Duration::days(1);
        let upcoming_end = today_start + Duration::days(4);

        let sources = KnowledgeSources {
            diary_entries: self
                .store
                .recent_diary_entries(user_id, MAX_DIARY_ENTRIES as i64)
                .await?,
            goals: self.store.active_goals(user_id, MAX_GOALS as i64).await?,
            today_items: self
                .store
                .schedule_items_between(
                    user_id,
                    today_start,
                    tomorrow_start,
                    MAX_TODAY_ITEMS as i64,
                )
                .await?,
            upcoming_items: self
                .store
                .schedule_items_between(
                    user_id,
                    tomorrow_start,
                    upcoming_end,
                    MAX_UPCOMING_ITEMS as i64,
                )
                .await?,
            favorites: self
                .store
                .favorite_entertainment(user_id, MAX_FAVORITES as i64)
                .await?,
            profile: self.store.user_profile(user_id).await?,
        };

        Ok(assemble_knowledge_context(&sources))
    }
}

fn override_endpoint(config: &AssistantConfigRecord) -> Option<(String, String)> {
    let provider_override = config.provider_override.as_ref()?;
    let vendor_url = provider_override
        .vendor_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    let api_key = provider_override
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;
    Some((vendor_url.to_string(), api_key.to_string()))
}

fn request_model(config: &AssistantConfigRecord) -> String {
    config
        .provider_override
        .as_ref()
        .and_then(|provider_override| provider_override.model.as_deref())
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| config.model.clone())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::ProviderOverride;
    use crate::repos::AssistantConfigRecord;

    use super::{override_endpoint, request_model};

    fn config_with_override(provider_override: Option<ProviderOverride>) -> AssistantConfigRecord {
        AssistantConfigRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Daily helper".to_string(),
            description: None,
            system_prompt: "You are concise.".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: "0.7".to_string(),
            max_tokens: 2000,
            top_p: "1".to_string(),
            frequency_penalty: "0".to_string(),
            presence_penalty: "0".to_string(),
            icon: "🤖".to_string(),
            is_default: true,
            is_active: true,
            provider_override,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn no_override_means_shared_default_gateway() {
        assert!(override_endpoint(&config_with_override(None)).is_none());
    }

    #[test]
    fn override_requires_both_url_and_key() {
        let url_only = config_with_override(Some(ProviderOverride {
            vendor_url: Some("https://llm.example.com/v1".to_string()),
            api_key: None,
            model: None,
        }));
        assert!(override_endpoint(&url_only).is_none());

        let blank_key = config_with_override(Some(ProviderOverride {
            vendor_url: Some("https://llm.example.com/v1".to_string()),
            api_key: Some("   ".to_string()),
            model: None,
        }));
        assert!(override_endpoint(&blank_key).is_none());

        let complete = config_with_override(Some(ProviderOverride {
            vendor_url: Some(" https://llm.example.com/v1 ".to_string()),
            api_key: Some("sk-test".to_string()),
            model: None,
        }));
        assert_eq!(
            override_endpoint(&complete),
            Some((
                "https://llm.example.com/v1".to_string(),
                "sk-test".to_string()
            ))
        );
    }

    #[test]
    fn override_model_wins_over_config_model() {
        let config = config_with_override(Some(ProviderOverride {
            vendor_url: None,
            api_key: None,
            model: Some("local-llama".to_string()),
        }));
        assert_eq!(request_model(&config), "local-llama");

        let config = config_with_override(Some(ProviderOverride {
            vendor_url: None,
            api_key: None,
            model: Some("  ".to_string()),
        }));
        assert_eq!(request_model(&config), "gpt-3.5-turbo");
    }
}
