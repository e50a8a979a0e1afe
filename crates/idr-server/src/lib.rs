//! HTTP server for identity reconciliation.
//!
//! Exposes `POST /identify` over a configured contact store, plus health
//! and info endpoints.

pub mod backend;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use backend::ContactBackend;
pub use config::{ServerConfig, StoreConfig};
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::IdrServer;
