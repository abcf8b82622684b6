use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::chat_orchestrator::ChatOrchestrator;
use shared::llm::ChatGateway;
use shared::repos::Store;
use uuid::Uuid;

mod assistant;
mod authn;
mod errors;
mod health;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub orchestrator: ChatOrchestrator,
    pub gateway: Arc<dyn ChatGateway>,
    pub default_model: String,
}

#[derive(Clone, Copy)]
pub(super) struct AuthUser {
    pub(super) user_id: Uuid,
}

pub fn build_router(app_state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .with_state(app_state.clone());

    let auth_layer_state = app_state.clone();

    let protected_routes = Router::new()
        .route("/v1/assistant/chat", post(assistant::chat))
        .route(
            "/v1/assistant/chat/history/{session_id}",
            get(assistant::chat_history),
        )
        .route("/v1/assistant/chat/sessions", get(assistant::list_sessions))
        .route(
            "/v1/assistant/configs",
            get(assistant::list_configs).post(assistant::create_config),
        )
        .route(
            "/v1/assistant/configs/{config_id}",
            get(assistant::get_config)
                .put(assistant::update_config)
                .delete(assistant::delete_config),
        )
        .route(
            "/v1/assistant/configs/{config_id}/set-default",
            post(assistant::set_default_config),
        )
        .route(
            "/v1/assistant/generate-study-plan",
            post(assistant::generate_study_plan),
        )
        .route("/v1/assistant/models", get(assistant::list_models))
        .route("/v1/assistant/test", post(assistant::test_connection))
        .layer(middleware::from_fn_with_state(
            auth_layer_state,
            authn::auth_middleware,
        ))
        .with_state(app_state);

    public_routes.merge(protected_routes)
}
