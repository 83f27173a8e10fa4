use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::assessment::{AssessmentRow, QuestionRow};
use crate::models::attempt::{AnswerRow, AttemptRow, AttemptStatus, NewAnswer, ReviewRow};
use crate::models::user::AppUser;
use crate::store::{AssessmentStore, AttemptScorer, UserDirectory};

/// Conflicting inserts can lose the re-read to a concurrent submit; retry a few times.
const OPEN_ATTEMPT_RETRIES: usize = 3;

/// Postgres-backed store. Also serves as the user directory.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Locks the attempt row for the rest of the transaction and checks it is still open.
async fn lock_open_attempt(
    tx: &mut Transaction<'_, Postgres>,
    attempt_id: i64,
) -> Result<AttemptRow, AppError> {
    let attempt: Option<AttemptRow> =
        sqlx::query_as("SELECT * FROM assessment_attempts WHERE id = $1 FOR UPDATE")
            .bind(attempt_id)
            .fetch_optional(&mut **tx)
            .await?;

    match attempt {
        None => Err(AppError::NotFound(format!("Attempt {attempt_id} not found"))),
        Some(a) if a.is_submitted() => Err(AppError::Conflict(format!(
            "Attempt {attempt_id} has already been submitted"
        ))),
        Some(a) => Ok(a),
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn find_assessment(&self, assessment_id: i64) -> Result<Option<AssessmentRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AssessmentRow>("SELECT * FROM assessments WHERE id = $1")
                .bind(assessment_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn list_questions(&self, assessment_id: i64) -> Result<Vec<QuestionRow>, AppError> {
        Ok(sqlx::query_as::<_, QuestionRow>(
            "SELECT * FROM assessment_questions WHERE assessment_id = $1 ORDER BY order_index, id",
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_attempt(&self, attempt_id: i64) -> Result<Option<AttemptRow>, AppError> {
        Ok(
            sqlx::query_as::<_, AttemptRow>("SELECT * FROM assessment_attempts WHERE id = $1")
                .bind(attempt_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn latest_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
    ) -> Result<Option<AttemptRow>, AppError> {
        Ok(sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT * FROM assessment_attempts
            WHERE assessment_id = $1 AND candidate_id = $2
            ORDER BY started_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(assessment_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn open_attempt(
        &self,
        assessment_id: i64,
        candidate_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        for _ in 0..OPEN_ATTEMPT_RETRIES {
            // The partial unique index turns a concurrent double-start into a no-op insert.
            let inserted: Option<AttemptRow> = sqlx::query_as(
                r#"
                INSERT INTO assessment_attempts (assessment_id, candidate_id, status, started_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (assessment_id, candidate_id) WHERE status = 'in_progress'
                DO NOTHING
                RETURNING *
                "#,
            )
            .bind(assessment_id)
            .bind(candidate_id)
            .bind(AttemptStatus::InProgress.as_str())
            .bind(started_at)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(attempt) = inserted {
                return Ok(attempt);
            }

            let existing: Option<AttemptRow> = sqlx::query_as(
                r#"
                SELECT * FROM assessment_attempts
                WHERE assessment_id = $1 AND candidate_id = $2 AND status = $3
                "#,
            )
            .bind(assessment_id)
            .bind(candidate_id)
            .bind(AttemptStatus::InProgress.as_str())
            .fetch_optional(&self.pool)
            .await?;

            if let Some(attempt) = existing {
                debug!(
                    "Concurrent start for assessment {assessment_id} resolved to attempt {}",
                    attempt.id
                );
                return Ok(attempt);
            }
        }

        warn!("Could not open an attempt for assessment {assessment_id}, candidate {candidate_id}");
        Err(AppError::Internal(anyhow::anyhow!(
            "open attempt for assessment {assessment_id} kept changing underneath insert"
        )))
    }

    async fn replace_answers(
        &self,
        attempt_id: i64,
        answers: &[NewAnswer],
    ) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        lock_open_attempt(&mut tx, attempt_id).await?;

        let mut written = 0u64;
        for answer in answers {
            sqlx::query(
                "DELETE FROM assessment_answers WHERE attempt_id = $1 AND question_id = $2",
            )
            .bind(attempt_id)
            .bind(answer.question_id)
            .execute(&mut *tx)
            .await?;

            written += sqlx::query(
                r#"
                INSERT INTO assessment_answers (attempt_id, question_id, response, auto_score)
                VALUES ($1, $2, $3, NULL)
                "#,
            )
            .bind(attempt_id)
            .bind(answer.question_id)
            .bind(&answer.response)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }

    async fn finalize_attempt(
        &self,
        attempt_id: i64,
        scorer: AttemptScorer,
        submitted_at: DateTime<Utc>,
    ) -> Result<AttemptRow, AppError> {
        let mut tx = self.pool.begin().await?;
        let attempt = lock_open_attempt(&mut tx, attempt_id).await?;

        // Saves take the same row lock, so these reads are the answers being closed.
        let questions: Vec<QuestionRow> = sqlx::query_as(
            "SELECT * FROM assessment_questions WHERE assessment_id = $1 ORDER BY order_index, id",
        )
        .bind(attempt.assessment_id)
        .fetch_all(&mut *tx)
        .await?;
        let answers: Vec<AnswerRow> = sqlx::query_as(
            "SELECT * FROM assessment_answers WHERE attempt_id = $1 ORDER BY question_id",
        )
        .bind(attempt_id)
        .fetch_all(&mut *tx)
        .await?;

        let (scores, total) = scorer(&questions, &answers);
        for score in &scores {
            sqlx::query(
                "UPDATE assessment_answers SET auto_score = $1 WHERE id = $2 AND attempt_id = $3",
            )
            .bind(score.auto_score)
            .bind(score.answer_id)
            .bind(attempt_id)
            .execute(&mut *tx)
            .await?;
        }

        let closed: AttemptRow = sqlx::query_as(
            r#"
            UPDATE assessment_attempts
            SET status = $1, submitted_at = $2, auto_score = $3
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(AttemptStatus::Submitted.as_str())
        .bind(submitted_at)
        .bind(total)
        .bind(attempt_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!("Scored {} answer(s) on attempt {attempt_id}", answers.len());
        Ok(closed)
    }

    async fn review_rows(&self, attempt_id: i64) -> Result<Vec<ReviewRow>, AppError> {
        Ok(sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT a.question_id, q.prompt, q.kind, q.correct_answer, q.order_index,
                   a.response, a.auto_score
            FROM assessment_answers a
            LEFT JOIN assessment_questions q ON q.id = a.question_id
            WHERE a.attempt_id = $1
            ORDER BY q.order_index NULLS LAST, a.question_id
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AppUser>, AppError> {
        Ok(sqlx::query_as::<_, AppUser>(
            "SELECT id, email, account_type FROM app_users WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn has_membership(&self, user_id: i64, organization_id: i64) -> Result<bool, AppError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM memberships WHERE user_id = $1 AND organization_id = $2)",
        )
        .bind(user_id)
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?)
    }
}
