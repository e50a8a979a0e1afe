use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use idr_store::{ContactStore, ContactTx};
use idr_types::{Contact, ContactId, NewContact};

use crate::clock::{Clock, SystemClock};
use crate::error::{EngineError, EngineResult};
use crate::request::IdentifyRequest;
use crate::validation::{ClusterValidator, ValidationReport};
use crate::view::{build_view, ContactView};

/// Runs identity reconciliation against a [`ContactStore`].
///
/// The reconciler holds no state of its own between calls; everything it
/// knows lives in the store.
pub struct Reconciler<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: ContactStore> Reconciler<S> {
    /// Create a reconciler stamping records with wall-clock time.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `request` to an identity cluster, creating, linking or
    /// merging contacts as needed, and return the cluster's view.
    ///
    /// All reads and writes happen in one store transaction: on error
    /// nothing is committed and the call can be retried as a whole.
    pub fn identify(&self, request: &IdentifyRequest) -> EngineResult<ContactView> {
        let request = request.normalized();
        let email = request.email.as_deref();
        let phone_number = request.phone_number.as_deref();
        let now = self.clock.now();

        self.store
            .transaction(|tx| reconcile(tx, email, phone_number, now))
    }

    /// View of the cluster that contains contact `id`.
    pub fn cluster(&self, id: ContactId) -> EngineResult<ContactView> {
        self.store.transaction(|tx| {
            let contact = tx.find_by_id(id)?.ok_or(EngineError::ContactNotFound(id))?;
            let primary = load_primary(tx, &contact)?;
            cluster_view(tx, primary)
        })
    }

    /// Audit the flat-cluster invariant across the whole store.
    pub fn validate(&self) -> EngineResult<ValidationReport> {
        self.store
            .transaction(|tx| Ok::<_, EngineError>(ClusterValidator::validate(tx)?))
    }
}

fn reconcile(
    tx: &mut dyn ContactTx,
    email: Option<&str>,
    phone_number: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<ContactView> {
    let matched = tx.find_by_email_or_phone(email, phone_number)?;
    debug!(matched = matched.len(), ?email, ?phone_number, "matched contacts");

    if matched.is_empty() {
        let created = tx.insert(NewContact::primary(
            email.map(str::to_owned),
            phone_number.map(str::to_owned),
            now,
        ))?;
        info!(id = %created.id, "created primary contact");
        return build_view(&[created]);
    }

    let candidates = candidate_primaries(tx, &matched)?;
    let survivor = candidates
        .iter()
        .min_by_key(|c| (c.created_at, c.id))
        .cloned()
        .ok_or(EngineError::NoPrimary)?;
    debug!(survivor = %survivor.id, candidates = candidates.len(), "selected primary");

    for absorbed in candidates.into_iter().filter(|c| c.id != survivor.id) {
        let absorbed_id = absorbed.id;
        let retargeted = absorb(tx, absorbed, survivor.id, now)?;
        info!(
            survivor = %survivor.id,
            absorbed = %absorbed_id,
            retargeted,
            "merged identity clusters"
        );
    }

    if !matched.iter().any(|c| c.has_pair(email, phone_number)) {
        let created = tx.insert(NewContact::secondary(
            email.map(str::to_owned),
            phone_number.map(str::to_owned),
            survivor.id,
            now,
        ))?;
        info!(id = %created.id, primary = %survivor.id, "created secondary contact");
    }

    cluster_view(tx, survivor)
}

/// Distinct primaries of every matched contact, ascending by id.
///
/// A matched secondary's primary is fetched even when it did not match
/// the query itself.
fn candidate_primaries(tx: &dyn ContactTx, matched: &[Contact]) -> EngineResult<Vec<Contact>> {
    let ids: BTreeSet<ContactId> = matched.iter().map(Contact::primary_id).collect();
    let ids: Vec<ContactId> = ids.into_iter().collect();
    let primaries = tx.find_by_ids(&ids)?;

    for contact in matched {
        let linked = contact.primary_id();
        let resolved = primaries
            .iter()
            .any(|p| p.id == linked && p.is_primary());
        if !resolved {
            return Err(EngineError::BrokenLink {
                contact: contact.id,
                linked,
            });
        }
    }
    Ok(primaries)
}

/// Demote `absorbed` under `survivor` and retarget its secondaries.
///
/// Contacts that already link to `survivor` are left untouched. Returns
/// how many former secondaries of `absorbed` were rewritten.
fn absorb(
    tx: &mut dyn ContactTx,
    mut absorbed: Contact,
    survivor: ContactId,
    now: DateTime<Utc>,
) -> EngineResult<usize> {
    let secondaries = tx.find_cluster(absorbed.id)?;

    if absorbed.link_to(survivor, now) {
        tx.update(&absorbed)?;
    }

    let mut retargeted = 0;
    for mut secondary in secondaries {
        if secondary.link_to(survivor, now) {
            tx.update(&secondary)?;
            retargeted += 1;
        }
    }
    Ok(retargeted)
}

fn load_primary(tx: &dyn ContactTx, contact: &Contact) -> EngineResult<Contact> {
    let Some(linked) = contact.linked_id() else {
        return Ok(contact.clone());
    };
    match tx.find_by_id(linked)? {
        Some(primary) if primary.is_primary() => Ok(primary),
        _ => Err(EngineError::BrokenLink {
            contact: contact.id,
            linked,
        }),
    }
}

fn cluster_view(tx: &dyn ContactTx, primary: Contact) -> EngineResult<ContactView> {
    let mut cluster = tx.find_cluster(primary.id)?;
    cluster.push(primary);
    build_view(&cluster)
}
