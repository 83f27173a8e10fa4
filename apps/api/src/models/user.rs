use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Application-level user record, distinct from the authentication session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AppUser {
    pub id: i64,
    pub email: String,
    pub account_type: String,
}
