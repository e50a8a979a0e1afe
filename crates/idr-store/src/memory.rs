use std::collections::BTreeMap;
use std::sync::RwLock;

use idr_types::{Contact, ContactId, NewContact};

use crate::error::{StoreError, StoreResult};
use crate::traits::{ContactStore, ContactTx};

#[derive(Clone, Debug, Default)]
struct State {
    contacts: BTreeMap<ContactId, Contact>,
    last_id: u64,
}

/// In-memory, `BTreeMap`-based contact store.
///
/// Intended for tests and embedding. A transaction holds the write lock for
/// its whole duration and works on a private copy of the state, which
/// replaces the shared state only when the transaction body succeeds.
pub struct InMemoryContactStore {
    state: RwLock<State>,
}

impl InMemoryContactStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Number of contacts currently stored.
    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|state| state.contacts.len())
            .unwrap_or_default()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored contact, ascending by id.
    pub fn snapshot(&self) -> StoreResult<Vec<Contact>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.contacts.values().cloned().collect())
    }
}

impl Default for InMemoryContactStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

impl ContactStore for InMemoryContactStore {
    fn transaction<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn ContactTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut shared = self.state.write().map_err(poisoned)?;
        let mut working = shared.clone();
        let value = f(&mut MemoryTx {
            state: &mut working,
        })?;
        *shared = working;
        Ok(value)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemoryTx<'a> {
    state: &'a mut State,
}

impl ContactTx for MemoryTx<'_> {
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>> {
        let matched = self
            .state
            .contacts
            .values()
            .filter(|c| {
                let email_hit = email.is_some() && c.email.as_deref() == email;
                let phone_hit = phone_number.is_some() && c.phone_number.as_deref() == phone_number;
                email_hit || phone_hit
            })
            .cloned()
            .collect();
        Ok(matched)
    }

    fn find_by_id(&self, id: ContactId) -> StoreResult<Option<Contact>> {
        Ok(self.state.contacts.get(&id).cloned())
    }

    fn find_cluster(&self, primary: ContactId) -> StoreResult<Vec<Contact>> {
        Ok(self
            .state
            .contacts
            .values()
            .filter(|c| c.linked_id() == Some(primary))
            .cloned()
            .collect())
    }

    fn all_contacts(&self) -> StoreResult<Vec<Contact>> {
        Ok(self.state.contacts.values().cloned().collect())
    }

    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact> {
        self.state.last_id += 1;
        let id = ContactId::new(self.state.last_id);
        let stored = contact.into_contact(id);
        self.state.contacts.insert(id, stored.clone());
        Ok(stored)
    }

    fn update(&mut self, contact: &Contact) -> StoreResult<Contact> {
        let existing = self
            .state
            .contacts
            .get_mut(&contact.id)
            .ok_or(StoreError::NotFound(contact.id))?;
        let created_at = existing.created_at;
        *existing = contact.clone();
        existing.created_at = created_at;
        Ok(existing.clone())
    }

    fn contact_count(&self) -> StoreResult<u64> {
        Ok(self.state.contacts.len() as u64)
    }
}

impl std::fmt::Debug for InMemoryContactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContactStore")
            .field("contact_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn new_primary(email: Option<&str>, phone: Option<&str>) -> NewContact {
        NewContact::primary(email.map(Into::into), phone.map(Into::into), at(1_000))
    }

    fn insert(store: &InMemoryContactStore, contact: NewContact) -> Contact {
        store
            .transaction(|tx| tx.insert(contact.clone()))
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Inserts and lookups
    // -----------------------------------------------------------------------

    #[test]
    fn insert_assigns_monotonic_ids() {
        let store = InMemoryContactStore::new();
        let a = insert(&store, new_primary(Some("a@x.io"), None));
        let b = insert(&store, new_primary(Some("b@x.io"), None));
        assert_eq!(a.id, ContactId::new(1));
        assert_eq!(b.id, ContactId::new(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn find_by_email_or_phone_is_boolean_or() {
        let store = InMemoryContactStore::new();
        insert(&store, new_primary(Some("a@x.io"), Some("111")));
        insert(&store, new_primary(Some("b@x.io"), Some("222")));
        insert(&store, new_primary(Some("c@x.io"), Some("333")));

        let found: Vec<u64> = store
            .transaction(|tx| tx.find_by_email_or_phone(Some("a@x.io"), Some("222")))
            .unwrap()
            .iter()
            .map(|c| c.id.get())
            .collect();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn absent_criteria_match_nothing() {
        let store = InMemoryContactStore::new();
        insert(&store, new_primary(None, Some("111")));
        insert(&store, new_primary(Some("b@x.io"), None));

        let (none, email_only) = store
            .transaction(|tx| {
                let none = tx.find_by_email_or_phone(None, None)?;
                let email_only = tx.find_by_email_or_phone(Some("b@x.io"), None)?;
                Ok::<_, StoreError>((none, email_only))
            })
            .unwrap();
        assert!(none.is_empty());
        assert_eq!(email_only.len(), 1);
        assert_eq!(email_only[0].id, ContactId::new(2));
    }

    #[test]
    fn find_cluster_returns_only_linked_rows() {
        let store = InMemoryContactStore::new();
        let p = insert(&store, new_primary(Some("a@x.io"), None));
        insert(&store, new_primary(Some("b@x.io"), None));
        insert(
            &store,
            NewContact::secondary(Some("c@x.io".into()), None, p.id, at(2_000)),
        );

        let cluster = store
            .transaction(|tx| tx.find_cluster(p.id))
            .unwrap();
        assert_eq!(cluster.len(), 1);
        assert_eq!(cluster[0].id, ContactId::new(3));
    }

    #[test]
    fn find_by_ids_skips_missing_and_dedups() {
        let store = InMemoryContactStore::new();
        insert(&store, new_primary(Some("a@x.io"), None));
        insert(&store, new_primary(Some("b@x.io"), None));

        let found = store
            .transaction(|tx| {
                tx.find_by_ids(&[ContactId::new(2), ContactId::new(9), ContactId::new(2)])
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ContactId::new(2));
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    #[test]
    fn update_keeps_created_at() {
        let store = InMemoryContactStore::new();
        let mut c = insert(&store, new_primary(Some("a@x.io"), None));
        c.link_to(ContactId::new(7), at(5_000));
        c.created_at = at(9_999);

        let stored = store
            .transaction(|tx| tx.update(&c))
            .unwrap();
        assert_eq!(stored.created_at, at(1_000));
        assert_eq!(stored.updated_at, at(5_000));
        assert_eq!(stored.linked_id(), Some(ContactId::new(7)));
    }

    #[test]
    fn update_missing_contact_fails() {
        let store = InMemoryContactStore::new();
        let ghost = new_primary(Some("a@x.io"), None).into_contact(ContactId::new(42));
        let err = store
            .transaction(|tx| tx.update(&ghost))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == ContactId::new(42)));
    }

    // -----------------------------------------------------------------------
    // Atomicity
    // -----------------------------------------------------------------------

    #[test]
    fn failed_transaction_discards_writes() {
        let store = InMemoryContactStore::new();
        let p = insert(&store, new_primary(Some("a@x.io"), None));

        let result: Result<(), StoreError> = store.transaction(|tx| {
            tx.insert(new_primary(Some("b@x.io"), None))?;
            let mut demoted = p.clone();
            demoted.link_to(ContactId::new(99), at(3_000));
            tx.update(&demoted)?;
            Err(StoreError::Unavailable("injected".into()))
        });
        assert!(result.is_err());

        let contacts = store.snapshot().unwrap();
        assert_eq!(contacts.len(), 1);
        assert!(contacts[0].is_primary());
    }

    #[test]
    fn rolled_back_insert_does_not_consume_id() {
        let store = InMemoryContactStore::new();
        let _ = store.transaction(|tx| {
            tx.insert(new_primary(Some("a@x.io"), None))?;
            Err::<(), _>(StoreError::Unavailable("injected".into()))
        });
        let c = insert(&store, new_primary(Some("b@x.io"), None));
        assert_eq!(c.id, ContactId::new(1));
    }

    #[test]
    fn writes_are_visible_within_transaction() {
        let store = InMemoryContactStore::new();
        let count = store
            .transaction(|tx| {
                tx.insert(new_primary(Some("a@x.io"), None))?;
                tx.contact_count()
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[test]
    fn concurrent_inserts_get_distinct_ids() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryContactStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let email = format!("user{i}@x.io");
                    store
                        .transaction(|tx| tx.insert(new_primary(Some(&email), None)))
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids: Vec<ContactId> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
    }

    #[test]
    fn debug_format() {
        let store = InMemoryContactStore::new();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryContactStore"));
        assert!(debug.contains("contact_count"));
        assert_eq!(store.backend_name(), "memory");
    }
}
