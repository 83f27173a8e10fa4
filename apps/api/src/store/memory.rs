//! In-memory store used by unit and router tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::{AssessmentRow, QuestionRow};
use crate::models::attempt::{AnswerRow, AttemptRow, AttemptStatus, NewAnswer, ReviewRow};
use crate::models::user::AppUser;
use crate::store::{AssessmentStore, AttemptScorer, UserDirectory};

#[derive(Default)]
struct Tables {
    assessments: Vec<AssessmentRow>,
    questions: Vec<QuestionRow>,
    attempts: Vec<AttemptRow>,
    answers: Vec<AnswerRow>,
    users: Vec<AppUser>,
    memberships: Vec<(i64, i64)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn open_attempt_status(&self, attempt_id: i64) -> Result<(), AppError> {
        let attempt = self
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;
        if attempt.is_submitted() {
            return Err(AppError::Conflict(format!(
                "Attempt {attempt_id} has already been submitted"
            )));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_organization_assessment(&self, organization_id: i64, published: bool) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        t.assessments.push(AssessmentRow {
            id,
            organization_id,
            title: format!("Assessment {id}"),
            published,
            created_at: Utc::now(),
        });
        id
    }

    pub fn add_question(
        &self,
        assessment_id: i64,
        prompt: &str,
        kind: &str,
        correct_answer: Option<&str>,
        order_index: i32,
    ) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        t.questions.push(QuestionRow {
            id,
            assessment_id,
            prompt: prompt.to_string(),
            kind: kind.to_string(),
            correct_answer: correct_answer.map(String::from),
            order_index,
        });
        id
    }

    pub fn add_user(&self, email: &str, account_type: &str) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        t.users.push(AppUser {
            id,
            email: email.to_string(),
            account_type: account_type.to_string(),
        });
        id
    }

    pub fn add_membership(&self, user_id: i64, organization_id: i64) {
        self.tables
            .lock()
            .unwrap()
            .memberships
            .push((user_id, organization_id));
    }

    pub fn set_status(&self, attempt_id: i64, status: AttemptStatus) {
        let mut t = self.tables.lock().unwrap();
        if let Some(a) = t.attempts.iter_mut().find(|a| a.id == attempt_id) {
            a.status = status.as_str().to_string();
        }
    }

    pub fn attempt_count(&self) -> usize {
        self.tables.lock().unwrap().attempts.len()
    }

    pub fn answers_for(&self, attempt_id: i64) -> Vec<AnswerRow> {
        self.tables
            .lock()
            .unwrap()
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<AssessmentRow>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.assessments.iter().find(|a| a.id == assessment_id).cloned())
    }

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<QuestionRow>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut questions: Vec<_> = t
            .questions
            .iter()
            .filter(|q| q.assessment_id == assessment_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order_index, q.id));
        Ok(questions)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<AttemptRow>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.attempts.iter().find(|a| a.id == attempt_id).cloned())
    }

    async fn latest_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
    ) -> Result<Option<AttemptRow>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.attempts
            .iter()
            .filter(|a| a.assessment_id == assessment_id && a.candidate_id == candidate_id)
            .max_by_key(|a| (a.started_at, a.id))
            .cloned())
    }

    async fn open_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        let mut t = self.tables.lock().unwrap();
        if let Some(open) = t.attempts.iter().find(|a| {
            a.assessment_id == assessment_id && a.candidate_id == candidate_id && !a.is_submitted()
        }) {
            return Ok(open.clone());
        }
        let attempt = AttemptRow {
            id: t.next_id(),
            assessment_id,
            candidate_id,
            status: AttemptStatus::InProgress.as_str().to_string(),
            started_at,
            submitted_at: None,
            auto_score: None,
        };
        t.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn replace_answers(
        &self,
        attempt_id: i64,
        answers: &[NewAnswer],
    ) -> Result<u64, AppError> {
        let mut t = self.tables.lock().unwrap();
        t.open_attempt_status(attempt_id)?;
        for answer in answers {
            t.answers
                .retain(|a| !(a.attempt_id == attempt_id && a.question_id == answer.question_id));
            let id = t.next_id();
            t.answers.push(AnswerRow {
                id,
                attempt_id,
                question_id: answer.question_id,
                response: answer.response.clone(),
                auto_score: None,
                created_at: Utc::now(),
            });
        }
        Ok(answers.len() as u64)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        scorer: AttemptScorer,
        submitted_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        let mut t = self.tables.lock().unwrap();
        t.open_attempt_status(attempt_id)?;
        let assessment_id = t
            .attempts
            .iter()
            .find(|a| a.id == attempt_id)
            .map(|a| a.assessment_id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;

        let mut questions: Vec<QuestionRow> = t
            .questions
            .iter()
            .filter(|q| q.assessment_id == assessment_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| (q.order_index, q.id));
        let mut answers: Vec<AnswerRow> = t
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.question_id);

        let (scores, total) = scorer(&questions, &answers);
        for score in scores {
            if let Some(answer) = t
                .answers
                .iter_mut()
                .find(|a| a.id == score.answer_id && a.attempt_id == attempt_id)
            {
                answer.auto_score = score.auto_score;
            }
        }
        let attempt = t
            .attempts
            .iter_mut()
            .find(|a| a.id == attempt_id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt {attempt_id} not found")))?;
        attempt.status = AttemptStatus::Submitted.as_str().to_string();
        attempt.submitted_at = Some(submitted_at);
        attempt.auto_score = total;
        Ok(attempt.clone())
    }

    async fn review_rows(&self, attempt_id: i64) -> Result<Vec<ReviewRow>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut rows: Vec<ReviewRow> = t
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .map(|a| {
                let question = t.questions.iter().find(|q| q.id == a.question_id);
                ReviewRow {
                    question_id: a.question_id,
                    prompt: question.map(|q| q.prompt.clone()),
                    kind: question.map(|q| q.kind.clone()),
                    correct_answer: question.and_then(|q| q.correct_answer.clone()),
                    order_index: question.map(|q| q.order_index),
                    response: a.response.clone(),
                    auto_score: a.auto_score,
                }
            })
            .collect();
        rows.sort_by_key(|r| (r.order_index.unwrap_or(i32::MAX), r.question_id));
        Ok(rows)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError> {
        let t = self.tables.lock().unwrap();
        let email = email.trim();
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn has_membership(&self, user_id: i64, organization_id: i64) -> Result<bool, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.memberships.contains(&(user_id, organization_id)))
    }
}

/// Wraps a `MemoryStore` to force interleavings at await points.
///
/// `latest_attempt` yields to the scheduler after reading, so concurrent
/// starts all observe "no attempt" before any of them opens one.
/// `finalize_attempt` first applies a queued save, as if that save committed
/// between the submit's ownership check and its lock.
pub struct SteppedStore {
    pub inner: MemoryStore,
    queued_save: Mutex<Option<(i64, Vec<NewAnswer>)>>,
}

impl SteppedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            queued_save: Mutex::new(None),
        }
    }

    pub fn save_before_finalize(&self, attempt_id: i64, answers: Vec<NewAnswer>) {
        *self.queued_save.lock().unwrap() = Some((attempt_id, answers));
    }
}

#[async_trait]
impl AssessmentStore for SteppedStore {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<AssessmentRow>, AppError> {
        self.inner.find_assessment(assessment_id).await
    }

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<QuestionRow>, AppError> {
        self.inner.list_questions(assessment_id).await
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<AttemptRow>, AppError> {
        self.inner.find_attempt(attempt_id).await
    }

    async fn latest_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
    ) -> Result<Option<AttemptRow>, AppError> {
        let latest = self.inner.latest_attempt(assessment_id, candidate_id).await;
        tokio::task::yield_now().await;
        latest
    }

    async fn open_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        self.inner
            .open_attempt(assessment_id, candidate_id, started_at)
            .await
    }

    async fn replace_answers(
        &self,
        attempt_id: i64,
        answers: &[NewAnswer],
    ) -> Result<u64, AppError> {
        self.inner.replace_answers(attempt_id, answers).await
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        scorer: AttemptScorer,
        submitted_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        let queued = self.queued_save.lock().unwrap().take();
        if let Some((save_attempt, answers)) = queued {
            self.inner.replace_answers(save_attempt, &answers).await?;
        }
        self.inner
            .finalize_attempt(attempt_id, scorer, submitted_at)
            .await
    }

    async fn review_rows(&self, attempt_id: i64) -> Result<Vec<ReviewRow>, AppError> {
        self.inner.review_rows(attempt_id).await
    }
}

/// Shorthand for the `{value: ...}` envelope raw answers are stored in.
pub fn raw(value: Value) -> Value {
    serde_json::json!({ "value": value })
}
