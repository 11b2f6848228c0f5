//! Parameter-governance proposal aggregates.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// A request to change a named governance parameter.
///
/// Keyed by the opaque proposal identifier assigned by the parameterizer
/// contract. `accepted` and `expired` are mutually exclusive terminal
/// states reached from the single "proposed" origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamProposal {
    /// Opaque fixed-size proposal identifier.
    pub prop_id: B256,

    /// Name of the parameter being changed.
    pub name: String,

    /// Proposed parameter value.
    pub value: U256,

    /// Deposit staked by the proposer, in base units.
    pub deposit: U256,

    /// Account that raised the proposal.
    pub proposer: Address,

    /// Unix timestamp at which the proposal's challenge window expires.
    pub app_expiry: Option<i64>,

    /// Identifier of an open challenge against the proposal, if any.
    pub challenge_id: Option<u64>,

    /// Terminal: the proposal was accepted and the parameter updated.
    pub accepted: bool,

    /// Terminal: the proposal expired or was rejected.
    pub expired: bool,

    /// Unix timestamp of the last state-changing event.
    pub last_updated: i64,
}

impl ParamProposal {
    /// Apply a field-level patch.
    pub fn apply(&mut self, patch: &ParamProposalPatch) {
        if let Some(accepted) = patch.accepted {
            self.accepted = accepted;
        }
        if let Some(expired) = patch.expired {
            self.expired = expired;
        }
        if let Some(challenge_id) = patch.challenge_id {
            self.challenge_id = challenge_id;
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// A parameter proposal raised through the government contract.
///
/// Same terminal-state rules as [`ParamProposal`] but projected from the
/// government contract family and kept in its own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovtParamProposal {
    /// Opaque fixed-size proposal identifier.
    pub prop_id: B256,

    /// Name of the parameter being changed.
    pub name: String,

    /// Proposed parameter value.
    pub value: U256,

    /// Account that raised the proposal.
    pub proposer: Address,

    /// Terminal: accepted.
    pub accepted: bool,

    /// Terminal: expired or rejected.
    pub expired: bool,

    /// Unix timestamp of the last state-changing event.
    pub last_updated: i64,
}

impl GovtParamProposal {
    /// Apply a field-level patch. Challenge references do not apply here.
    pub fn apply(&mut self, patch: &ParamProposalPatch) {
        if let Some(accepted) = patch.accepted {
            self.accepted = accepted;
        }
        if let Some(expired) = patch.expired {
            self.expired = expired;
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// Field-level partial update shared by both proposal aggregates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamProposalPatch {
    /// New accepted flag.
    pub accepted: Option<bool>,

    /// New expired flag.
    pub expired: Option<bool>,

    /// New challenge reference; `Some(None)` clears it.
    pub challenge_id: Option<Option<u64>>,

    /// New last-updated timestamp.
    pub last_updated: Option<i64>,
}

impl ParamProposalPatch {
    /// Names of the fields this patch writes.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.accepted.is_some() {
            fields.push("accepted");
        }
        if self.expired.is_some() {
            fields.push("expired");
        }
        if self.challenge_id.is_some() {
            fields.push("challenge_id");
        }
        if self.last_updated.is_some() {
            fields.push("last_updated");
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_reaches_terminal_state() {
        let mut prop = ParamProposal {
            prop_id: B256::repeat_byte(0x42),
            name: "minDeposit".to_string(),
            value: U256::from(500),
            deposit: U256::from(100),
            proposer: Address::repeat_byte(0x33),
            app_expiry: Some(1_000),
            challenge_id: None,
            accepted: false,
            expired: false,
            last_updated: 0,
        };

        prop.apply(&ParamProposalPatch {
            accepted: Some(true),
            last_updated: Some(900),
            ..Default::default()
        });

        assert!(prop.accepted);
        assert!(!prop.expired);
        assert_eq!(prop.last_updated, 900);
    }
}
