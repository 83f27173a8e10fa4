//! Candidate identity derivation.
//!
//! Candidates do not need an account row with a UUID key: their identity is a
//! name-based UUID (v5, SHA-1) of their email under a fixed namespace, so the
//! same email always maps to the same candidate across sessions and services.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::{uuid, Uuid};

/// Fixed namespace for candidate ids. Changing it orphans every existing attempt.
pub const CANDIDATE_NAMESPACE: Uuid = uuid!("3f8c2a6e-5b1d-4c7a-9e2f-0d4b7a1c6e95");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId(Uuid);

impl CandidateId {
    /// Emails are trimmed and lower-cased first so casing never forks an identity.
    pub fn from_email(email: &str) -> Self {
        let normalized = email.trim().to_lowercase();
        CandidateId(Uuid::new_v5(&CANDIDATE_NAMESPACE, normalized.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
