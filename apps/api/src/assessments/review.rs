//! Review Reader: the organization-side view of an attempt's answers.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::attempt::ReviewRow;
use crate::store::{AssessmentStore, UserDirectory};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub question: Option<String>,
    pub kind: Option<String>,
    pub correct_answer: Option<String>,
    pub response: Value,
    pub auto_score: Option<f64>,
}

impl From<ReviewRow> for ReviewEntry {
    fn from(row: ReviewRow) -> Self {
        ReviewEntry {
            question: row.prompt,
            kind: row.kind,
            correct_answer: row.correct_answer,
            response: row.response,
            auto_score: row.auto_score,
        }
    }
}

/// Returns one entry per stored answer, in question order.
///
/// The caller must map to an application user holding a membership in the
/// organization that owns the assessment.
pub async fn get_review(
    store: &dyn AssessmentStore,
    directory: &dyn UserDirectory,
    assessment_id: i64,
    attempt_id: i64,
    reviewer: &CurrentUser,
) -> Result<Vec<ReviewEntry>, AppError> {
    let user = directory
        .find_user_by_email(&reviewer.email)
        .await?
        .ok_or_else(|| {
            warn!(
                "Review of attempt {attempt_id} denied: no application user for session {}",
                reviewer.id
            );
            AppError::Forbidden("No application user for this session".to_string())
        })?;

    let assessment = store
        .find_assessment(assessment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Assessment {assessment_id} not found")))?;

    if !directory
        .has_membership(user.id, assessment.organization_id)
        .await?
    {
        warn!(
            "Review of attempt {attempt_id} denied: user {} is not a member of organization {}",
            user.id, assessment.organization_id
        );
        return Err(AppError::Forbidden(format!(
            "User {} is not a member of organization {}",
            user.id, assessment.organization_id
        )));
    }

    store
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.assessment_id == assessment_id)
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Attempt {attempt_id} not found for assessment {assessment_id}"
            ))
        })?;

    let rows = store.review_rows(attempt_id).await?;
    Ok(rows.into_iter().map(ReviewEntry::from).collect())
}
