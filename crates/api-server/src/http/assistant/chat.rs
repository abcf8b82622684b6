use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::chat_orchestrator::ChatTurnInput;
use shared::models::{ChatRequest, ChatResponse, ChatTurnResponse, SessionListResponse};

use super::super::errors::{bad_request_response, chat_error_response, store_error_response};
use super::super::{AppState, AuthUser};

pub(crate) async fn chat(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ChatRequest>,
) -> Response {
    if req.message.trim().is_empty() {
        return bad_request_response("invalid_message", "Message must not be empty");
    }

    let input = ChatTurnInput {
        message: req.message,
        session_id: req.session_id,
        config_id: req.assistant_config_id,
        use_knowledge: req.use_knowledge_base,
    };

    match state.orchestrator.run_turn(user.user_id, input).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChatResponse {
                message: outcome.message,
                session_id: outcome.session_id,
                tokens_used: outcome.tokens_used,
                model: outcome.model,
            }),
        )
            .into_response(),
        Err(err) => chat_error_response(err),
    }
}

pub(crate) async fn chat_history(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(session_id): Path<String>,
) -> Response {
    match state.store.session_history(user.user_id, &session_id).await {
        Ok(turns) => {
            let items: Vec<_> = turns
                .into_iter()
                .map(|turn| ChatTurnResponse {
                    id: turn.id,
                    session_id: turn.session_id,
                    role: turn.role,
                    content: turn.content,
                    tokens_used: turn.tokens_used,
                    model: turn.model,
                    created_at: turn.created_at,
                })
                .collect();
            (StatusCode::OK, Json(items)).into_response()
        }
        Err(err) => store_error_response(err),
    }
}

pub(crate) async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    match state.store.list_session_ids(user.user_id).await {
        Ok(sessions) => {
            (StatusCode::OK, Json(SessionListResponse { sessions })).into_response()
        }
        Err(err) => store_error_response(err),
    }
}
