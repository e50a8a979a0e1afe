//! The [`ContactStore`] and [`ContactTx`] traits defining the storage interface.

use idr_types::{Contact, ContactId, NewContact};

use crate::error::{StoreError, StoreResult};

/// Handle through which one transaction reads and writes contacts.
///
/// Every call sees the writes made earlier through the same handle.
pub trait ContactTx {
    /// All contacts whose email equals `email` or whose phone number equals
    /// `phone_number`, ascending by id.
    ///
    /// An absent criterion matches nothing; both absent returns an empty list.
    fn find_by_email_or_phone(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Vec<Contact>>;

    /// Read a contact by id. Returns `Ok(None)` if it does not exist.
    fn find_by_id(&self, id: ContactId) -> StoreResult<Option<Contact>>;

    /// All contacts whose `linked_id` is `primary`, ascending by id.
    ///
    /// The primary itself is not included.
    fn find_cluster(&self, primary: ContactId) -> StoreResult<Vec<Contact>>;

    /// Every stored contact, ascending by id.
    fn all_contacts(&self) -> StoreResult<Vec<Contact>>;

    /// Persist a new contact and return it with its assigned id.
    fn insert(&mut self, contact: NewContact) -> StoreResult<Contact>;

    /// Replace the mutable fields of an existing contact.
    ///
    /// Returns [`StoreError::NotFound`] if no contact has `contact.id`. The
    /// stored `created_at` is kept regardless of what `contact` carries.
    fn update(&mut self, contact: &Contact) -> StoreResult<Contact>;

    /// Read several contacts by id, ascending. Unknown ids are skipped.
    ///
    /// Default implementation calls `find_by_id()` for each distinct id.
    fn find_by_ids(&self, ids: &[ContactId]) -> StoreResult<Vec<Contact>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(contact) = self.find_by_id(id)? {
                found.push(contact);
            }
        }
        Ok(found)
    }

    /// Number of stored contacts.
    fn contact_count(&self) -> StoreResult<u64> {
        Ok(self.all_contacts()?.len() as u64)
    }
}

/// Transactional contact storage.
///
/// Implementations must satisfy these invariants:
/// - `f` observes a consistent snapshot and its writes are applied all
///   together or not at all.
/// - Transactions are serialized with respect to each other.
/// - A backend may invoke `f` more than once when it has to restart a
///   transaction that could not begin; writes from a discarded attempt are
///   never visible.
pub trait ContactStore: Send + Sync {
    /// Run `f` inside one transaction, committing iff it returns `Ok`.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn ContactTx) -> Result<T, E>,
        E: From<StoreError>;

    /// Short backend name for diagnostics ("memory", "sqlite").
    fn backend_name(&self) -> &'static str;
}

impl<S: ContactStore> ContactStore for std::sync::Arc<S> {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnMut(&mut dyn ContactTx) -> Result<T, E>,
        E: From<StoreError>,
    {
        (**self).transaction(f)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
