use std::collections::BTreeMap;

use serde::Serialize;

use idr_store::{ContactTx, StoreResult};
use idr_types::{Contact, ContactId};

/// Result of auditing every cluster in a store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub contact_count: u64,
    pub primary_count: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if every cluster is flat and fully linked.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A contact whose link breaks the flat-cluster invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub contact: ContactId,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// `linked_id` names a contact that does not exist.
    DanglingLink,
    /// `linked_id` names another secondary.
    ChainedLink,
    /// `linked_id` names the contact itself.
    SelfLink,
}

/// Flat-cluster auditor.
pub struct ClusterValidator;

impl ClusterValidator {
    /// Audit every contact visible through `tx`.
    pub fn validate(tx: &dyn ContactTx) -> StoreResult<ValidationReport> {
        Ok(Self::validate_contacts(&tx.all_contacts()?))
    }

    /// Audit an explicit set of contacts.
    pub fn validate_contacts(contacts: &[Contact]) -> ValidationReport {
        let by_id: BTreeMap<ContactId, &Contact> = contacts.iter().map(|c| (c.id, c)).collect();
        let mut violations = Vec::new();

        for contact in contacts {
            let Some(linked) = contact.linked_id() else {
                continue;
            };
            if linked == contact.id {
                violations.push(Violation {
                    contact: contact.id,
                    kind: ViolationKind::SelfLink,
                    description: format!("contact {} links to itself", contact.id),
                });
                continue;
            }
            match by_id.get(&linked) {
                None => violations.push(Violation {
                    contact: contact.id,
                    kind: ViolationKind::DanglingLink,
                    description: format!("linked contact {linked} does not exist"),
                }),
                Some(target) if target.is_secondary() => violations.push(Violation {
                    contact: contact.id,
                    kind: ViolationKind::ChainedLink,
                    description: format!(
                        "linked contact {linked} is itself secondary of {}",
                        target.primary_id()
                    ),
                }),
                Some(_) => {}
            }
        }

        ValidationReport {
            contact_count: contacts.len() as u64,
            primary_count: contacts.iter().filter(|c| c.is_primary()).count() as u64,
            violations,
        }
    }
}
