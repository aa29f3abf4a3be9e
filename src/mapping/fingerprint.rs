//! Content fingerprints over mapped fields.
//!
//! A fingerprint covers exactly the fields the mapper carries, so two
//! records that mirror each other's mapped content hash identically and a
//! webhook that fired without a real change is detectable as noise.

use crate::mapping::normalized::NormalizedTask;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA-256 over a normalized task's mapped fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wraps an already-computed hex digest (storage rehydration).
    #[must_use]
    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the digest as hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a normalized task.
///
/// Fields are fed in a fixed order with NUL separators so the digest is
/// stable across runs and processes. Source identity and timestamps are
/// deliberately excluded: the fingerprint describes content, not provenance.
#[must_use]
pub fn fingerprint(task: &NormalizedTask) -> Fingerprint {
    let mut hasher = Sha256::new();
    feed(&mut hasher, "title", &task.title);
    let due_date = task
        .due
        .as_ref()
        .and_then(|due| due.date)
        .map(|date| date.to_string())
        .unwrap_or_default();
    feed(&mut hasher, "due_date", &due_date);
    let due_recurrence = task
        .due
        .as_ref()
        .and_then(|due| due.recurrence.clone())
        .unwrap_or_default();
    feed(&mut hasher, "due_string", &due_recurrence);
    feed(&mut hasher, "priority", &task.priority.value().to_string());
    feed(&mut hasher, "project", task.project.as_deref().unwrap_or(""));
    let labels = task.labels.iter().cloned().collect::<Vec<_>>().join(",");
    feed(&mut hasher, "labels", &labels);
    feed(
        &mut hasher,
        "description",
        task.description.as_deref().unwrap_or(""),
    );
    feed(
        &mut hasher,
        "completed",
        if task.completed { "1" } else { "0" },
    );
    Fingerprint(hex::encode(hasher.finalize()))
}

fn feed(hasher: &mut Sha256, key: &str, value: &str) {
    hasher.update(key.as_bytes());
    hasher.update(b"=");
    hasher.update(value.as_bytes());
    hasher.update(b"\0");
}
