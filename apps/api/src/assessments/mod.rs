// Assessment attempt lifecycle: start → save drafts → submit → organization review.
// Every operation takes the resolved caller explicitly; none reads request state.

pub mod drafts;
pub mod finalizer;
pub mod handlers;
pub mod issuer;
pub mod payload;
pub mod review;

use tracing::warn;

use crate::errors::AppError;
use crate::identity::CandidateId;
use crate::models::attempt::AttemptRow;
use crate::store::AssessmentStore;

/// Parses a numeric identifier coming from a path or payload key.
pub fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            AppError::Validation(format!("{what} must be a positive integer, got '{raw}'"))
        })
}

/// Loads an attempt that must belong to `assessment_id` and to `candidate`.
///
/// An attempt under a different assessment is reported as not found; one owned
/// by another candidate is an authorization failure.
pub async fn load_owned_attempt(
    store: &dyn AssessmentStore,
    assessment_id: i64,
    attempt_id: i64,
    candidate: CandidateId,
) -> Result<AttemptRow, AppError> {
    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.assessment_id == assessment_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Attempt {attempt_id} not found for assessment {assessment_id}"
            ))
        })?;

    if attempt.candidate_id != candidate.as_uuid() {
        warn!(
            "Candidate {candidate} tried to access attempt {attempt_id} owned by another candidate"
        );
        return Err(AppError::Forbidden(format!(
            "Attempt {attempt_id} belongs to another candidate"
        )));
    }

    Ok(attempt)
}
