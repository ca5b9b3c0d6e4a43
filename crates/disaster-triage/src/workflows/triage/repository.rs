use chrono::{DateTime, Utc};
use serde::Serialize;

use super::session::{AssessmentSession, SessionId};

/// Stored session plus bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub session: AssessmentSession,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(session: AssessmentSession, now: DateTime<Utc>) -> Self {
        Self {
            session,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.session.id
    }
}

/// Storage abstraction so the service can be exercised without a backend.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, record: SessionRecord) -> Result<SessionRecord, RepositoryError>;
    /// Apply `change` to the stored record while holding it exclusively. The
    /// record is only replaced when `change` succeeds.
    fn modify<F, E>(&self, id: &SessionId, change: F) -> Result<SessionRecord, E>
    where
        F: FnOnce(&mut SessionRecord) -> Result<(), E>,
        E: From<RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<SessionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
