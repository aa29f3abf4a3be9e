//! Record identity types shared by every reconciliation component.
//!
//! A record is identified by the backend it lives in plus its id within that
//! backend. Identities are the unit of exclusivity for the apply engine: at
//! most one reconciliation may be in flight per identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two task backends kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemSide {
    /// The structured-database service (records are pages with typed
    /// properties).
    Database,
    /// The task-list service (records are flat tasks).
    Tasklist,
}

impl SystemSide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Database => Self::Tasklist,
            Self::Tasklist => Self::Database,
        }
    }

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Tasklist => "tasklist",
        }
    }
}

impl fmt::Display for SystemSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque record id within one backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps a backend-native id.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record's full identity: the backend it lives in plus its id there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordIdentity {
    /// Backend holding the record.
    pub side: SystemSide,
    /// Record id within that backend.
    pub id: RecordId,
}

impl RecordIdentity {
    /// Creates an identity from a side and an id.
    #[must_use]
    pub fn new(side: SystemSide, id: impl Into<String>) -> Self {
        Self {
            side,
            id: RecordId::new(id),
        }
    }
}

impl fmt::Display for RecordIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.side, self.id)
    }
}
