use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::id::ContactId;

/// Flat precedence tag, as stored in a database column or shown to users.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkPrecedence {
    Primary,
    Secondary,
}

impl LinkPrecedence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl FromStr for LinkPrecedence {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            other => Err(TypeError::UnknownPrecedence(other.to_string())),
        }
    }
}

impl fmt::Display for LinkPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a contact inside its identity cluster.
///
/// A secondary always names its primary directly; there is no way to express
/// a secondary without a link, or a primary with one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "linkPrecedence", rename_all = "lowercase")]
pub enum Link {
    Primary,
    Secondary {
        #[serde(rename = "linkedId")]
        primary: ContactId,
    },
}

impl Link {
    /// Rebuild a link from its flat storage columns.
    pub fn from_parts(
        id: ContactId,
        precedence: LinkPrecedence,
        linked_id: Option<ContactId>,
    ) -> Result<Self, TypeError> {
        match (precedence, linked_id) {
            (LinkPrecedence::Primary, None) => Ok(Self::Primary),
            (LinkPrecedence::Primary, Some(linked)) => {
                Err(TypeError::UnexpectedLink { id, linked })
            }
            (LinkPrecedence::Secondary, Some(primary)) => Ok(Self::Secondary { primary }),
            (LinkPrecedence::Secondary, None) => Err(TypeError::MissingLink { id }),
        }
    }

    pub fn precedence(&self) -> LinkPrecedence {
        match self {
            Self::Primary => LinkPrecedence::Primary,
            Self::Secondary { .. } => LinkPrecedence::Secondary,
        }
    }

    pub fn linked_id(&self) -> Option<ContactId> {
        match self {
            Self::Primary => None,
            Self::Secondary { primary } => Some(*primary),
        }
    }
}

/// A stored identity assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: ContactId,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    #[serde(flatten)]
    pub link: Link,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Reserved soft-delete marker. Nothing sets it today.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn is_primary(&self) -> bool {
        matches!(self.link, Link::Primary)
    }

    pub fn is_secondary(&self) -> bool {
        !self.is_primary()
    }

    pub fn link_precedence(&self) -> LinkPrecedence {
        self.link.precedence()
    }

    pub fn linked_id(&self) -> Option<ContactId> {
        self.link.linked_id()
    }

    /// Id of the primary this contact belongs to (its own id if primary).
    pub fn primary_id(&self) -> ContactId {
        self.link.linked_id().unwrap_or(self.id)
    }

    /// Exact pair equality; an absent field only equals an absent field.
    pub fn has_pair(&self, email: Option<&str>, phone_number: Option<&str>) -> bool {
        self.email.as_deref() == email && self.phone_number.as_deref() == phone_number
    }

    /// Point this contact at `primary` as a secondary.
    ///
    /// Returns `false` and leaves the record untouched when it already links
    /// there, so repeated merges do not rewrite `updated_at`.
    pub fn link_to(&mut self, primary: ContactId, now: DateTime<Utc>) -> bool {
        let target = Link::Secondary { primary };
        if self.link == target {
            return false;
        }
        self.link = target;
        self.updated_at = now;
        true
    }
}

/// A contact that has not been persisted yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewContact {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub link: Link,
    pub created_at: DateTime<Utc>,
}

impl NewContact {
    pub fn primary(
        email: Option<String>,
        phone_number: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            phone_number,
            link: Link::Primary,
            created_at: now,
        }
    }

    pub fn secondary(
        email: Option<String>,
        phone_number: Option<String>,
        primary: ContactId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            phone_number,
            link: Link::Secondary { primary },
            created_at: now,
        }
    }

    /// Materialize the record once the store has picked an id.
    pub fn into_contact(self, id: ContactId) -> Contact {
        Contact {
            id,
            email: self.email,
            phone_number: self.phone_number,
            link: self.link,
            created_at: self.created_at,
            updated_at: self.created_at,
            deleted_at: None,
        }
    }
}
