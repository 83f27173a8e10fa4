//! Attempt Issuer: finds or creates the single open attempt for a candidate.

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::identity::CandidateId;
use crate::models::attempt::{AttemptRow, AttemptStatus};
use crate::store::AssessmentStore;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartedAttempt {
    pub attempt_id: i64,
    pub status: AttemptStatus,
}

impl From<&AttemptRow> for StartedAttempt {
    fn from(attempt: &AttemptRow) -> Self {
        StartedAttempt {
            attempt_id: attempt.id,
            status: if attempt.is_submitted() {
                AttemptStatus::Submitted
            } else {
                AttemptStatus::InProgress
            },
        }
    }
}

/// Resumes the candidate's latest attempt if it is still open, otherwise opens
/// a new one. Unpublished assessments are reported as not found.
pub async fn start_attempt(
    store: &dyn AssessmentStore,
    assessment_id: i64,
    candidate: CandidateId,
) -> Result<StartedAttempt, AppError> {
    store
        .find_assessment(assessment_id)
        .await?
        .filter(|a| a.published)
        .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))?;

    if let Some(latest) = store
        .latest_attempt(assessment_id, candidate.as_uuid())
        .await?
    {
        if !latest.is_submitted() {
            info!("Resuming attempt {} on assessment {assessment_id}", latest.id);
            return Ok(StartedAttempt::from(&latest));
        }
    }

    let attempt = store
        .open_attempt(assessment_id, candidate.as_uuid(), Utc::now())
        .await?;
    info!(
        "Opened attempt {} on assessment {assessment_id} for candidate {candidate}",
        attempt.id
    );
    Ok(StartedAttempt::from(&attempt))
}
