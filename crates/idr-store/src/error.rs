use idr_types::{ContactId, TypeError};

/// Errors from contact store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An update targeted a contact that does not exist.
    #[error("contact not found: {0}")]
    NotFound(ContactId),

    /// A stored row does not decode into a valid contact.
    #[error("corrupt contact row {id}: {reason}")]
    Corrupt { id: ContactId, reason: String },

    /// The store stayed locked by another writer past the retry budget.
    #[error("transaction conflict after {attempts} attempts")]
    Conflict { attempts: u32 },

    /// The store cannot be used (poisoned lock, closed connection).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Error reported by SQLite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub(crate) fn corrupt(id: ContactId, err: TypeError) -> Self {
        Self::Corrupt {
            id,
            reason: err.to_string(),
        }
    }

    /// Whether running the same operation again from scratch may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Unavailable(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
