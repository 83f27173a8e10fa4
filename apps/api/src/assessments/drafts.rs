//! Answer Store: replaces draft answers on an open attempt.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assessments::payload::AnswerPayload;
use crate::assessments::{load_owned_attempt, parse_id};
use crate::errors::AppError;
use crate::identity::CandidateId;
use crate::models::attempt::NewAnswer;
use crate::store::AssessmentStore;

#[derive(Debug, Deserialize)]
pub struct SaveDraftRequest {
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerPayload>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SaveDraftResponse {
    pub saved: u64,
}

/// Validates question ids against the assessment and converts payloads to storage form.
async fn prepare_answers(
    store: &dyn AssessmentStore,
    assessment_id: i64,
    answers: BTreeMap<String, AnswerPayload>,
) -> Result<Vec<NewAnswer>, AppError> {
    let known: HashSet<i64> = store
        .list_questions(assessment_id)
        .await?
        .into_iter()
        .map(|q| q.id)
        .collect();

    let mut seen = HashSet::new();
    answers
        .into_iter()
        .map(|(key, payload)| {
            let question_id = parse_id(&key, "question id")?;
            // "12" and "012" name the same question; one batch may answer it once.
            if !seen.insert(question_id) {
                return Err(AppError::Validation(format!(
                    "Question {question_id} appears more than once in this save"
                )));
            }
            if !known.contains(&question_id) {
                return Err(AppError::Validation(format!(
                    "Question {question_id} is not part of assessment {assessment_id}"
                )));
            }
            Ok(NewAnswer {
                question_id,
                response: payload.into_stored(),
            })
        })
        .collect()
}

/// Saves draft answers for the candidate's own open attempt.
///
/// Each question present in the request has its stored answer replaced; other
/// questions are left untouched. The replacement is atomic per request.
pub async fn save_draft(
    store: &dyn AssessmentStore,
    assessment_id: i64,
    attempt_id: i64,
    candidate: CandidateId,
    request: SaveDraftRequest,
) -> Result<SaveDraftResponse, AppError> {
    let attempt = load_owned_attempt(store, assessment_id, attempt_id, candidate).await?;
    if attempt.is_submitted() {
        return Err(AppError::Conflict(format!(
            "Attempt {attempt_id} has already been submitted"
        )));
    }

    let answers = prepare_answers(store, assessment_id, request.answers).await?;
    let saved = store.replace_answers(attempt_id, &answers).await?;

    info!("Saved {saved} draft answer(s) on attempt {attempt_id}");
    Ok(SaveDraftResponse { saved })
}
