use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Attempt lifecycle. `InProgress` is the only state that accepts writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "submitted" => Ok(AttemptStatus::Submitted),
            other => Err(format!("unknown attempt status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttemptRow {
    pub id: i64,
    pub assessment_id: i64,
    pub candidate_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub auto_score: Option<f64>,
}

impl AttemptRow {
    /// Anything other than an explicit `in_progress` is treated as closed.
    pub fn is_submitted(&self) -> bool {
        !matches!(
            self.status.parse::<AttemptStatus>(),
            Ok(AttemptStatus::InProgress)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRow {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub response: Value,
    pub auto_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A draft answer about to replace whatever is stored for its question.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub question_id: i64,
    pub response: Value,
}

/// Per-answer score computed at submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerScore {
    pub answer_id: i64,
    pub auto_score: Option<f64>,
}

/// Answer joined with its question metadata for the review view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReviewRow {
    pub question_id: i64,
    pub prompt: Option<String>,
    pub kind: Option<String>,
    pub correct_answer: Option<String>,
    pub order_index: Option<i32>,
    pub response: Value,
    pub auto_score: Option<f64>,
}
