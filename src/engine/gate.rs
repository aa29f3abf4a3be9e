//! Per-identity admission control.
//!
//! At most one reconciliation runs per record identity. A notification
//! arriving while its identity is in flight is coalesced into a single
//! queued re-run, so bursts of duplicate webhooks collapse to one extra
//! pass and nothing is dropped.

use crate::identity::RecordIdentity;
use crate::intake::ChangeKind;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Result of asking the gate to admit a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller owns the identity and must run the reconciliation.
    Started,
    /// The identity is already in flight; the running pass will re-run for
    /// the coalesced notification.
    Coalesced,
}

#[derive(Debug, Default)]
struct InFlight {
    queued: Option<ChangeKind>,
}

/// Tracks in-flight record identities and their coalesced follow-ups.
#[derive(Debug, Default)]
pub struct IdentityGate {
    states: Mutex<HashMap<RecordIdentity, InFlight>>,
}

impl IdentityGate {
    /// Creates an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits a notification. [`Admission::Started`] transfers ownership of
    /// the identity to the caller until [`IdentityGate::finish`] returns
    /// `None`.
    pub fn begin(&self, identity: &RecordIdentity, kind: ChangeKind) -> Admission {
        let mut states = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(in_flight) = states.get_mut(identity) {
            // Latest notification wins: a deletion arriving after a queued
            // change supersedes it, and vice versa.
            in_flight.queued = Some(kind);
            return Admission::Coalesced;
        }
        states.insert(identity.clone(), InFlight::default());
        Admission::Started
    }

    /// Completes a pass for an identity. Returns the coalesced kind when
    /// another pass must run; `None` releases the identity.
    pub fn finish(&self, identity: &RecordIdentity) -> Option<ChangeKind> {
        let mut states = self
            .states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(in_flight) = states.get_mut(identity) {
            if let Some(kind) = in_flight.queued.take() {
                return Some(kind);
            }
            states.remove(identity);
        }
        None
    }

    /// Number of identities currently in flight.
    ///
    /// # Panics
    ///
    /// Never panics; a poisoned lock is recovered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
