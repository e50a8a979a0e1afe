//! Foundation types for identity reconciliation.
//!
//! This crate provides the record types shared by every other crate in the
//! workspace: the stored [`Contact`], its store-assigned [`ContactId`], and
//! the [`Link`] that places it in an identity cluster.
//!
//! # Key Types
//!
//! - [`ContactId`]: Monotonic, store-assigned row identifier
//! - [`Contact`]: One identity assertion (email and/or phone number)
//! - [`Link`]: Primary, or Secondary pointing at its primary
//! - [`LinkPrecedence`]: The flat `primary` / `secondary` tag used on the wire
//! - [`NewContact`]: A contact that has not been assigned an id yet

pub mod contact;
pub mod error;
pub mod id;

pub use contact::{Contact, Link, LinkPrecedence, NewContact};
pub use error::TypeError;
pub use id::ContactId;
