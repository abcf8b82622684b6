use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::chat_orchestrator::ChatError;
use shared::models::{ErrorBody, ErrorResponse};
use shared::repos::StoreError;
use tracing::{error, warn};

pub(super) fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        }),
    )
        .into_response()
}

pub(super) fn bad_request_response(code: &str, message: &str) -> Response {
    error_response(StatusCode::BAD_REQUEST, code, message)
}

pub(super) fn not_found_response(code: &str, message: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, code, message)
}

pub(super) fn ai_service_error_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "ai_service_error",
        "AI service error",
    )
}

pub(super) fn unauthorized_response() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "Missing or invalid bearer token",
    )
}

pub(super) fn store_error_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => not_found_response("not_found", "Resource not found"),
        StoreError::Conflict(message) => error_response(StatusCode::CONFLICT, "conflict", &message),
        other => {
            error!("database operation failed: {other}");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Unexpected server error",
            )
        }
    }
}

/// Provider failures surface as an opaque 500; the upstream detail goes
/// to the logs, never to the client.
pub(super) fn chat_error_response(err: ChatError) -> Response {
    match err {
        ChatError::ConfigNotFound => {
            not_found_response("config_not_found", "Assistant config not found")
        }
        ChatError::NoDefaultConfig => not_found_response(
            "no_default_config",
            "No default assistant config; create one first",
        ),
        ChatError::Store(store_err) => store_error_response(store_err),
        ChatError::ProviderClient(detail) => {
            warn!("provider client construction failed: {detail}");
            ai_service_error_response()
        }
        ChatError::Provider(provider_err) => {
            warn!("provider call failed: {provider_err}");
            ai_service_error_response()
        }
    }
}
