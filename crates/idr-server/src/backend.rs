use idr_store::{
    ContactStore, ContactTx, InMemoryContactStore, SqliteContactStore, StoreError,
};

/// The store chosen by configuration.
///
/// [`ContactStore::transaction`] is generic, so backends are selected with
/// an enum rather than a trait object.
#[derive(Debug)]
pub enum ContactBackend {
    Memory(InMemoryContactStore),
    Sqlite(SqliteContactStore),
}

impl ContactStore for ContactBackend {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn ContactTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self {
            Self::Memory(store) => store.transaction(f),
            Self::Sqlite(store) => store.transaction(f),
        }
    }

    fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(store) => store.backend_name(),
            Self::Sqlite(store) => store.backend_name(),
        }
    }
}
