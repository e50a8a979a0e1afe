use thiserror::Error;

use crate::id::ContactId;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid contact id: {0}")]
    InvalidId(String),

    #[error("unknown link precedence: {0}")]
    UnknownPrecedence(String),

    #[error("contact {id} is secondary but has no linked id")]
    MissingLink { id: ContactId },

    #[error("contact {id} is primary but links to {linked}")]
    UnexpectedLink { id: ContactId, linked: ContactId },
}
