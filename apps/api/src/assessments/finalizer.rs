//! Submission Finalizer: the only path from `in_progress` to `submitted`.
//!
//! Scores every stored answer against its question's correct-answer reference
//! and closes the attempt in one atomic store call.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::assessments::load_owned_attempt;
use crate::assessments::payload::comparable_text;
use crate::errors::AppError;
use crate::identity::CandidateId;
use crate::models::assessment::QuestionRow;
use crate::models::attempt::{AnswerRow, AnswerScore, AttemptStatus};
use crate::store::AssessmentStore;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAttempt {
    pub attempt_id: i64,
    pub status: AttemptStatus,
    pub auto_score: Option<f64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Scores one response. `None` when the question has no reference answer.
pub fn score_answer(correct_answer: Option<&str>, response: &serde_json::Value) -> Option<f64> {
    let expected = correct_answer?.trim();
    let matched = comparable_text(response)
        .map(|given| given.trim().to_lowercase() == expected.to_lowercase())
        .unwrap_or(false);
    Some(if matched { 1.0 } else { 0.0 })
}

/// Scores all answers; the aggregate is the sum of scorable answers, or `None`
/// when nothing was scorable.
pub fn score_attempt(
    questions: &[QuestionRow],
    answers: &[AnswerRow],
) -> (Vec<AnswerScore>, Option<f64>) {
    let reference: HashMap<i64, Option<&str>> = questions
        .iter()
        .map(|q| (q.id, q.correct_answer.as_deref()))
        .collect();

    let scores: Vec<AnswerScore> = answers
        .iter()
        .map(|a| AnswerScore {
            answer_id: a.id,
            auto_score: score_answer(
                reference.get(&a.question_id).copied().flatten(),
                &a.response,
            ),
        })
        .collect();

    let scorable: Vec<f64> = scores.iter().filter_map(|s| s.auto_score).collect();
    let total = (!scorable.is_empty()).then(|| scorable.iter().sum::<f64>());
    (scores, total)
}

pub async fn submit_attempt(
    store: &dyn AssessmentStore,
    assessment_id: i64,
    attempt_id: i64,
    candidate: CandidateId,
) -> Result<SubmittedAttempt, AppError> {
    let attempt = load_owned_attempt(store, assessment_id, attempt_id, candidate).await?;
    if attempt.is_submitted() {
        return Err(AppError::Conflict(format!(
            "Attempt {attempt_id} has already been submitted"
        )));
    }

    // Scoring runs inside the store's lock so it sees exactly the answers being closed.
    let closed = store
        .finalize_attempt(attempt_id, score_attempt, Utc::now())
        .await?;

    info!(
        "Submitted attempt {attempt_id} on assessment {assessment_id} (score {:?})",
        closed.auto_score
    );
    Ok(SubmittedAttempt {
        attempt_id: closed.id,
        status: AttemptStatus::Submitted,
        auto_score: closed.auto_score,
        submitted_at: closed.submitted_at,
    })
}
