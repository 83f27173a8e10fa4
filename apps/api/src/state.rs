use std::sync::Arc;

use crate::store::{AssessmentStore, UserDirectory};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Assessments, attempts and answers. `PgStore` in production.
    pub store: Arc<dyn AssessmentStore>,
    /// Maps authenticated emails to application users and memberships.
    pub directory: Arc<dyn UserDirectory>,
}
