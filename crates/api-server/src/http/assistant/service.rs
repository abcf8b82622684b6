use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::llm::{ChatCompletionRequest, ChatMessage, GenerationParams};
use shared::models::{ChatRole, ConnectionTestResponse, ModelListResponse};
use tracing::warn;

use super::super::AppState;
use super::super::errors::ai_service_error_response;

pub(crate) async fn list_models(State(state): State<AppState>) -> Response {
    match state.gateway.list_models().await {
        Ok(models) => (StatusCode::OK, Json(ModelListResponse { models })).into_response(),
        Err(err) => {
            warn!("model listing failed: {err}");
            ai_service_error_response()
        }
    }
}

/// A minimal one-message completion against the shared provider client.
/// Failures report as a degraded body rather than an error status so the
/// caller always gets a diagnosis.
pub(crate) async fn test_connection(State(state): State<AppState>) -> Response {
    let request = ChatCompletionRequest {
        model: state.default_model.clone(),
        messages: vec![ChatMessage::new(ChatRole::User, "Hello")],
        params: GenerationParams {
            temperature: "0".to_string(),
            max_tokens: 5,
            top_p: "1".to_string(),
            frequency_penalty: "0".to_string(),
            presence_penalty: "0".to_string(),
        },
    };

    match state.gateway.chat_completion(request).await {
        Ok(response) => (
            StatusCode::OK,
            Json(ConnectionTestResponse {
                status: "success".to_string(),
                message: "Provider connection is working".to_string(),
                model: Some(response.model),
            }),
        )
            .into_response(),
        Err(err) => {
            warn!("provider connection test failed: {err}");
            (
                StatusCode::OK,
                Json(ConnectionTestResponse {
                    status: "error".to_string(),
                    message: err.to_string(),
                    model: None,
                }),
            )
                .into_response()
        }
    }
}
