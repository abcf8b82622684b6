use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{AssistantConfigDraft, AssistantConfigPatch, OkResponse};
use uuid::Uuid;

use super::super::errors::{bad_request_response, store_error_response};
use super::super::{AppState, AuthUser};

pub(crate) async fn list_configs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    match state.store.list_assistant_configs(user.user_id).await {
        Ok(configs) => {
            let items: Vec<_> = configs
                .into_iter()
                .map(|config| config.into_response())
                .collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn create_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<AssistantConfigDraft>,
) -> Response {
    if draft.name.trim().is_empty() {
        return bad_request_response("invalid_name", "Config name must not be empty");
    }
    if draft.system_prompt.trim().is_empty() {
        return bad_request_response("invalid_system_prompt", "System prompt must not be empty");
    }
    if let Err(response) = validate_generation_params(
        Some(draft.temperature.as_str()),
        Some(draft.top_p.as_str()),
        Some(draft.frequency_penalty.as_str()),
        Some(draft.presence_penalty.as_str()),
        Some(draft.max_tokens),
    ) {
        return response;
    }

    match state.store.create_assistant_config(user.user_id, &draft).await {
        Ok(record) => (StatusCode::CREATED, Json(record.into_response())).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn get_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(config_id): Path<Uuid>,
) -> Response {
    match state.store.get_assistant_config(user.user_id, config_id).await {
        Ok(record) => (StatusCode::OK, Json(record.into_response())).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn update_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(config_id): Path<Uuid>,
    Json(patch): Json<AssistantConfigPatch>,
) -> Response {
    if patch.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return bad_request_response("invalid_name", "Config name must not be empty");
    }
    if patch
        .system_prompt
        .as_deref()
        .is_some_and(|prompt| prompt.trim().is_empty())
    {
        return bad_request_response("invalid_system_prompt", "System prompt must not be empty");
    }
    if let Err(response) = validate_generation_params(
        patch.temperature.as_deref(),
        patch.top_p.as_deref(),
        patch.frequency_penalty.as_deref(),
        patch.presence_penalty.as_deref(),
        patch.max_tokens,
    ) {
        return response;
    }

    match state
        .store
        .update_assistant_config(user.user_id, config_id, &patch)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record.into_response())).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn set_default_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(config_id): Path<Uuid>,
) -> Response {
    match state
        .store
        .set_default_assistant_config(user.user_id, config_id)
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record.into_response())).into_response(),
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn delete_config(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(config_id): Path<Uuid>,
) -> Response {
    match state
        .store
        .delete_assistant_config(user.user_id, config_id)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(OkResponse { ok: true })).into_response(),
        Err(err) => store_error_response(err),
    }
}

/// Generation parameters arrive as decimal strings; anything that does
/// not parse to a finite number is rejected before it can reach the
/// database or the provider.
fn validate_generation_params(
    temperature: Option<&str>,
    top_p: Option<&str>,
    frequency_penalty: Option<&str>,
    presence_penalty: Option<&str>,
    max_tokens: Option<i32>,
) -> Result<(), Response> {
    let fields = [
        ("temperature", temperature),
        ("top_p", top_p),
        ("frequency_penalty", frequency_penalty),
        ("presence_penalty", presence_penalty),
    ];

    for (name, value) in fields {
        if let Some(raw) = value {
            let parsed = raw.trim().parse::<f64>();
            if !parsed.map(f64::is_finite).unwrap_or(false) {
                return Err(bad_request_response(
                    "invalid_parameter",
                    &format!("{name} must be a finite decimal number"),
                ));
            }
        }
    }

    if max_tokens.is_some_and(|value| value <= 0) {
        return Err(bad_request_response(
            "invalid_parameter",
            "max_tokens must be a positive integer",
        ));
    }

    Ok(())
}
