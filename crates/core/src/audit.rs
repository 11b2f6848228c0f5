//! Governance audit trail records.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::provenance::EventProvenance;

/// Append-only audit record of a state-changing action on a listing.
///
/// Never mutated after creation except for a last-updated timestamp
/// refresh on replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceEvent {
    /// Listing the action applies to.
    pub listing_address: Address,

    /// Account that sent the originating transaction.
    pub sender: Address,

    /// Free-form metadata captured from the event payload.
    pub metadata: BTreeMap<String, String>,

    /// Event-type label (normalized event name).
    pub event_type: String,

    /// Unix timestamp of record creation.
    pub created: i64,

    /// Unix timestamp of the last refresh.
    pub last_updated: i64,

    /// Block coordinates of the emitting log.
    pub provenance: EventProvenance,

    /// Stable identity hash of the emitting log.
    pub event_hash: B256,
}

impl GovernanceEvent {
    /// Apply a field-level patch.
    pub fn apply(&mut self, patch: &GovernanceEventPatch) {
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// Field-level partial update for [`GovernanceEvent`].
///
/// Only the last-updated timestamp is writable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GovernanceEventPatch {
    /// New last-updated timestamp.
    pub last_updated: Option<i64>,
}

impl GovernanceEventPatch {
    /// Names of the fields this patch writes.
    pub fn field_names(&self) -> Vec<&'static str> {
        if self.last_updated.is_some() {
            vec!["last_updated"]
        } else {
            Vec::new()
        }
    }
}
