//! Axum route handlers for the assessment attempt API.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::assessments::drafts::{save_draft, SaveDraftRequest, SaveDraftResponse};
use crate::assessments::finalizer::{submit_attempt, SubmittedAttempt};
use crate::assessments::issuer::{start_attempt, StartedAttempt};
use crate::assessments::parse_id;
use crate::assessments::review::{get_review, ReviewEntry};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/v1/assessments/:id/attempts/start
pub async fn handle_start_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(assessment_id): Path<String>,
) -> Result<Json<StartedAttempt>, AppError> {
    let assessment_id = parse_id(&assessment_id, "assessment id")?;
    let started = start_attempt(state.store.as_ref(), assessment_id, user.candidate_id()).await?;
    Ok(Json(started))
}

/// POST /api/v1/assessments/:id/attempts/:attempt_id/save
pub async fn handle_save_draft(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((assessment_id, attempt_id)): Path<(String, String)>,
    Json(request): Json<SaveDraftRequest>,
) -> Result<Json<SaveDraftResponse>, AppError> {
    let assessment_id = parse_id(&assessment_id, "assessment id")?;
    let attempt_id = parse_id(&attempt_id, "attempt id")?;
    let response = save_draft(
        state.store.as_ref(),
        assessment_id,
        attempt_id,
        user.candidate_id(),
        request,
    )
    .await?;
    Ok(Json(response))
}

/// POST /api/v1/assessments/:id/attempts/:attempt_id/submit
pub async fn handle_submit_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((assessment_id, attempt_id)): Path<(String, String)>,
) -> Result<Json<SubmittedAttempt>, AppError> {
    let assessment_id = parse_id(&assessment_id, "assessment id")?;
    let attempt_id = parse_id(&attempt_id, "attempt id")?;
    let submitted = submit_attempt(
        state.store.as_ref(),
        assessment_id,
        attempt_id,
        user.candidate_id(),
    )
    .await?;
    Ok(Json(submitted))
}

/// GET /api/v1/assessments/:id/attempts/:attempt_id/review
///
/// Organization-side view; the caller must be a member of the owning organization.
pub async fn handle_get_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((assessment_id, attempt_id)): Path<(String, String)>,
) -> Result<Json<Vec<ReviewEntry>>, AppError> {
    let assessment_id = parse_id(&assessment_id, "assessment id")?;
    let attempt_id = parse_id(&attempt_id, "attempt id")?;
    let entries = get_review(
        state.store.as_ref(),
        state.directory.as_ref(),
        assessment_id,
        attempt_id,
        &user,
    )
    .await?;
    Ok(Json(entries))
}
