use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shared::models::{StudyPlanRequest, StudyPlanResponse, StudyPlanStatus};
use shared::study_plan::StudyPlanOutcome;

use super::super::errors::{bad_request_response, chat_error_response};
use super::super::{AppState, AuthUser};

pub(crate) async fn generate_study_plan(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<StudyPlanRequest>,
) -> Response {
    if req.prompt.trim().is_empty() {
        return bad_request_response("invalid_prompt", "Prompt must not be empty");
    }

    match state
        .orchestrator
        .generate_study_plan(user.user_id, &req.prompt)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome_to_response(outcome))).into_response(),
        Err(err) => chat_error_response(err),
    }
}

fn outcome_to_response(outcome: StudyPlanOutcome) -> StudyPlanResponse {
    match outcome {
        StudyPlanOutcome::Success {
            plan,
            tokens_used,
            model,
        } => StudyPlanResponse {
            status: StudyPlanStatus::Success,
            data: Some(plan),
            raw_content: None,
            error: None,
            tokens_used,
            model,
        },
        StudyPlanOutcome::ParseError {
            raw_content,
            error,
            tokens_used,
            model,
        } => StudyPlanResponse {
            status: StudyPlanStatus::ParseError,
            data: None,
            raw_content: Some(raw_content),
            error: Some(error),
            tokens_used,
            model,
        },
    }
}
