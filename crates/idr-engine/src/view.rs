use serde::{Deserialize, Serialize};

use idr_types::{Contact, ContactId};

use crate::error::{EngineError, EngineResult};

/// Aggregated view of one identity cluster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub primary_contact_id: ContactId,
    /// Distinct emails, the primary's first, then by ascending contact id.
    pub emails: Vec<String>,
    /// Distinct phone numbers, same ordering as `emails`.
    pub phone_numbers: Vec<String>,
    /// Ascending.
    pub secondary_contact_ids: Vec<ContactId>,
}

/// Aggregate a cluster (primary plus its secondaries, in any order).
///
/// When more than one member is primary, the oldest (then lowest id) is
/// reported; the others are left out of `secondary_contact_ids`.
pub fn build_view(cluster: &[Contact]) -> EngineResult<ContactView> {
    let primary = cluster
        .iter()
        .filter(|c| c.is_primary())
        .min_by_key(|c| (c.created_at, c.id))
        .ok_or(EngineError::NoPrimary)?;

    let mut rest: Vec<&Contact> = cluster.iter().filter(|c| c.id != primary.id).collect();
    rest.sort_by_key(|c| c.id);
    rest.dedup_by_key(|c| c.id);

    let mut emails = Vec::new();
    let mut phone_numbers = Vec::new();
    for contact in std::iter::once(primary).chain(rest.iter().copied()) {
        push_distinct(&mut emails, contact.email.as_deref());
        push_distinct(&mut phone_numbers, contact.phone_number.as_deref());
    }

    Ok(ContactView {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids: rest
            .iter()
            .filter(|c| c.is_secondary())
            .map(|c| c.id)
            .collect(),
    })
}

fn push_distinct(values: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_owned());
        }
    }
}
