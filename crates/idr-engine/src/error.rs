use idr_store::StoreError;
use idr_types::ContactId;

/// Errors produced by reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The store failed; nothing from the current call was committed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A lookup by id found nothing.
    #[error("contact not found: {0}")]
    ContactNotFound(ContactId),

    /// A secondary links to a contact that is missing or not primary.
    #[error("contact {contact} links to {linked}, which is not a stored primary")]
    BrokenLink {
        contact: ContactId,
        linked: ContactId,
    },

    /// A cluster handed to aggregation has no primary member.
    #[error("cluster has no primary contact")]
    NoPrimary,
}

impl EngineError {
    /// Whether the whole call may be retried from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
