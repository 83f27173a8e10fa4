//! Session boundary. The authentication gateway resolves the session and
//! forwards it as trusted headers; handlers receive an explicit `CurrentUser`.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::identity::CandidateId;

pub const USER_ID_HEADER: &str = "x-auth-user-id";
pub const USER_EMAIL_HEADER: &str = "x-auth-user-email";

/// The authenticated caller, as resolved by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

impl CurrentUser {
    pub fn candidate_id(&self) -> CandidateId {
        CandidateId::from_email(&self.email)
    }
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header_value(parts, USER_ID_HEADER).ok_or(AppError::Unauthorized)?;
        let email = header_value(parts, USER_EMAIL_HEADER).ok_or(AppError::Unauthorized)?;
        Ok(CurrentUser { id, email })
    }
}
