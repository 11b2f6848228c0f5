//! Registry listing aggregate.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::state::GovernanceState;

/// An entry in the curated registry.
///
/// Keyed by the on-chain account address of the listing contract. Minted by
/// an application event and governed through the challenge/whitelist
/// lifecycle.
///
/// Invariant: a resolved-and-failed challenge leaves `whitelisted = true`
/// and `challenge_id = None`; a resolved-and-succeeded challenge leaves
/// `whitelisted = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// On-chain account address identifying the listing.
    pub address: Address,

    /// Display name.
    pub name: String,

    /// Whether the listing is currently whitelisted.
    pub whitelisted: bool,

    /// Current governance lifecycle state.
    pub state: GovernanceState,

    /// Homepage URL.
    pub url: String,

    /// Charter reference URI.
    pub charter_uri: String,

    /// Owner account addresses.
    pub owner_addresses: Vec<Address>,

    /// Contributor account addresses.
    pub contributor_addresses: Vec<Address>,

    /// Unix timestamp of the application event, if any.
    pub application_date: Option<i64>,

    /// Unix timestamp of whitelisting approval, if any.
    pub approval_date: Option<i64>,

    /// Unix timestamp of the last state-changing event.
    pub last_updated: i64,

    /// Identifier of the active challenge, if one is open.
    pub challenge_id: Option<u64>,

    /// Unix timestamp at which the application window expires.
    pub app_expiry: Option<i64>,

    /// Deposit held outside the staked application amount, in base units.
    pub unstaked_deposit: Option<U256>,
}

impl Listing {
    /// Apply a field-level patch.
    pub fn apply(&mut self, patch: &ListingPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(whitelisted) = patch.whitelisted {
            self.whitelisted = whitelisted;
        }
        if let Some(state) = patch.state {
            self.state = state;
        }
        if let Some(approval_date) = patch.approval_date {
            self.approval_date = Some(approval_date);
        }
        if let Some(challenge_id) = patch.challenge_id {
            self.challenge_id = challenge_id;
        }
        if let Some(unstaked_deposit) = patch.unstaked_deposit {
            self.unstaked_deposit = Some(unstaked_deposit);
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// Field-level partial update for [`Listing`].
///
/// Only fields that are `Some` are written; everything else is left
/// untouched so concurrent external updates are not clobbered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPatch {
    /// New display name.
    pub name: Option<String>,

    /// New whitelisted flag.
    pub whitelisted: Option<bool>,

    /// New governance state.
    pub state: Option<GovernanceState>,

    /// New approval timestamp.
    pub approval_date: Option<i64>,

    /// New active challenge reference; `Some(None)` clears it.
    pub challenge_id: Option<Option<u64>>,

    /// New unstaked deposit total.
    pub unstaked_deposit: Option<U256>,

    /// New last-updated timestamp.
    pub last_updated: Option<i64>,
}

impl ListingPatch {
    /// Names of the fields this patch writes, in declaration order.
    ///
    /// Used by store implementations to build a targeted UPDATE.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.whitelisted.is_some() {
            fields.push("whitelisted");
        }
        if self.state.is_some() {
            fields.push("state");
        }
        if self.approval_date.is_some() {
            fields.push("approval_date");
        }
        if self.challenge_id.is_some() {
            fields.push("challenge_id");
        }
        if self.unstaked_deposit.is_some() {
            fields.push("unstaked_deposit");
        }
        if self.last_updated.is_some() {
            fields.push("last_updated");
        }
        fields
    }

    /// True when the patch writes nothing.
    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        Listing {
            address: Address::repeat_byte(0x11),
            name: "Example Times".to_string(),
            whitelisted: false,
            state: GovernanceState::Applied,
            url: String::new(),
            charter_uri: String::new(),
            owner_addresses: vec![Address::repeat_byte(0x22)],
            contributor_addresses: vec![],
            application_date: Some(1_000),
            approval_date: None,
            last_updated: 1_000,
            challenge_id: Some(7),
            app_expiry: Some(2_000),
            unstaked_deposit: None,
        }
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let mut listing = listing();
        let patch = ListingPatch {
            whitelisted: Some(true),
            state: Some(GovernanceState::AppWhitelisted),
            challenge_id: Some(None),
            last_updated: Some(1_500),
            ..Default::default()
        };

        listing.apply(&patch);

        assert!(listing.whitelisted);
        assert_eq!(listing.state, GovernanceState::AppWhitelisted);
        assert_eq!(listing.challenge_id, None);
        assert_eq!(listing.last_updated, 1_500);
        // Untouched fields survive.
        assert_eq!(listing.name, "Example Times");
        assert_eq!(listing.application_date, Some(1_000));
    }

    #[test]
    fn field_names_reflect_set_fields() {
        let patch = ListingPatch {
            whitelisted: Some(false),
            challenge_id: Some(Some(9)),
            ..Default::default()
        };
        assert_eq!(patch.field_names(), vec!["whitelisted", "challenge_id"]);
        assert!(!patch.is_empty());
        assert!(ListingPatch::default().is_empty());
    }
}
