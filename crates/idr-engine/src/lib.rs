//! Identity reconciliation engine.
//!
//! This crate is the heart of the workspace. Given an email and/or phone
//! number it decides whether the pair belongs to a known identity, extends
//! that identity, bridges two identities into one, or starts a new one, and
//! returns the aggregated view of the resulting cluster.
//!
//! It provides:
//! - [`Reconciler`] running one `identify` call as a single store transaction
//! - [`build_view`] aggregating a cluster into a [`ContactView`]
//! - [`Clock`] with [`SystemClock`] and the test-friendly [`ManualClock`]
//! - [`ClusterValidator`] auditing the flat-cluster invariant over a store

pub mod clock;
pub mod error;
pub mod reconciler;
pub mod request;
pub mod validation;
pub mod view;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use reconciler::Reconciler;
pub use request::IdentifyRequest;
pub use validation::{ClusterValidator, ValidationReport, Violation, ViolationKind};
pub use view::{build_view, ContactView};
