//! Transactional contact storage for identity reconciliation.
//!
//! The reconciliation engine never talks to a database directly. It opens a
//! transaction through [`ContactStore::transaction`] and performs every read
//! and write for one request through the [`ContactTx`] handle it is given.
//! A backend commits the transaction only when the closure returns `Ok`;
//! any error discards every write made inside it.
//!
//! # Storage Backends
//!
//! - [`InMemoryContactStore`] -- `BTreeMap`-based store for tests and embedding
//! - [`SqliteContactStore`] -- durable single-file store backed by SQLite
//!
//! # Design Rules
//!
//! 1. Ids are assigned by the store, start at 1 and increase with every insert.
//! 2. `id` and `created_at` of a stored row never change.
//! 3. A lookup with an absent criterion never matches on that field.
//! 4. Transactions are serialized: no two run their bodies concurrently.
//! 5. All backend errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContactStore;
pub use sqlite::{RetryPolicy, SqliteContactStore};
pub use traits::{ContactStore, ContactTx};
