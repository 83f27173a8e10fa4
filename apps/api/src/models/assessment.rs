use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AssessmentRow {
    pub id: i64,
    pub organization_id: i64,
    pub title: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

/// One question of an assessment. `kind` is free-form (`text`, `mcq`, `code`, ...);
/// only `correct_answer` drives auto-scoring.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub assessment_id: i64,
    pub prompt: String,
    pub kind: String,
    pub correct_answer: Option<String>,
    pub order_index: i32,
}
