//! Storage seams for the assessment-attempt service.
//!
//! `AppState` carries these as `Arc<dyn _>`: `PgStore` in production, an
//! in-memory store in tests. Every write that spans several statements is
//! atomic inside the implementation, so callers never observe a half-replaced
//! answer set or a half-finalized attempt.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::{AssessmentRow, QuestionRow};
use crate::models::attempt::{AnswerRow, AnswerScore, AttemptRow, NewAnswer, ReviewRow};
use crate::models::user::AppUser;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// Turns an attempt's questions and stored answers into per-answer scores and a total.
pub type AttemptScorer = fn(&[QuestionRow], &[AnswerRow]) -> (Vec<AnswerScore>, Option<f64>);

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<AssessmentRow>, AppError>;

    /// Questions of an assessment ordered by `order_index`, then id.
    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<QuestionRow>, AppError>;

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<AttemptRow>, AppError>;

    /// Most recently started attempt for the pair, whatever its status.
    async fn latest_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
    ) -> Result<Option<AttemptRow>, AppError>;

    /// Inserts an `in_progress` attempt unless one already exists for the pair,
    /// returning whichever attempt is open afterwards.
    async fn open_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError>;

    /// Replaces the stored answers for each question in `answers`, scoped to
    /// `attempt_id`. Fails with `Conflict` if the attempt is no longer open.
    async fn replace_answers(
        &self,
        attempt_id: i64,
        answers: &[NewAnswer],
    ) -> Result<u64, AppError>;

    /// Closes the attempt. Questions and answers are read under the attempt
    /// lock, scored with `scorer`, and the scores written in the same atomic
    /// unit, so a concurrent save either lands before scoring or gets `Conflict`.
    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        scorer: AttemptScorer,
        submitted_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError>;

    /// Answers of an attempt left-joined with question metadata, in question order.
    async fn review_rows(&self, attempt_id: i64) -> Result<Vec<ReviewRow>, AppError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError>;

    async fn has_membership(&self, user_id: i64, organization_id: i64) -> Result<bool, AppError>;
}
