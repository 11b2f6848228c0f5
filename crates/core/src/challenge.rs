//! Challenge, poll and appeal aggregates.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// A formal dispute against a listing or proposal, resolved by a poll.
///
/// Keyed by the sequential challenge identifier assigned by the source
/// contract. `resolved` is monotone: once set it is never cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    /// Sequential challenge identifier.
    pub challenge_id: u64,

    /// Address of the listing under challenge.
    pub listing_address: Address,

    /// Free-text statement supplied by the challenger.
    pub statement: String,

    /// Reward pool available to the winning side, in base units.
    pub reward_pool: U256,

    /// Account that raised the challenge.
    pub challenger: Address,

    /// Whether the challenge has been resolved.
    pub resolved: bool,

    /// Stake locked by the challenger, in base units.
    pub stake: U256,

    /// Total tokens at stake at resolution time, in base units.
    pub total_tokens: U256,

    /// Unix timestamp until which an appeal may be requested.
    pub request_appeal_expiry: Option<i64>,

    /// The commit/reveal poll deciding this challenge, once created.
    pub poll: Option<Poll>,

    /// The appeal raised against the poll outcome, if any.
    pub appeal: Option<Appeal>,

    /// Unix timestamp of the last state-changing event.
    pub last_updated: i64,
}

impl Challenge {
    /// Apply a field-level patch. `resolved` only ever moves to `true`.
    pub fn apply(&mut self, patch: &ChallengePatch) {
        if let Some(resolved) = patch.resolved {
            self.resolved = self.resolved || resolved;
        }
        if let Some(reward_pool) = patch.reward_pool {
            self.reward_pool = reward_pool;
        }
        if let Some(total_tokens) = patch.total_tokens {
            self.total_tokens = total_tokens;
        }
        if let Some(expiry) = patch.request_appeal_expiry {
            self.request_appeal_expiry = Some(expiry);
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// Field-level partial update for [`Challenge`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChallengePatch {
    /// Resolution flag; `Some(false)` is a no-op because resolution is
    /// monotone.
    pub resolved: Option<bool>,

    /// New reward pool.
    pub reward_pool: Option<U256>,

    /// New total tokens at stake.
    pub total_tokens: Option<U256>,

    /// New appeal-request expiry.
    pub request_appeal_expiry: Option<i64>,

    /// New last-updated timestamp.
    pub last_updated: Option<i64>,
}

impl ChallengePatch {
    /// Names of the fields this patch writes.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.resolved.is_some() {
            fields.push("resolved");
        }
        if self.reward_pool.is_some() {
            fields.push("reward_pool");
        }
        if self.total_tokens.is_some() {
            fields.push("total_tokens");
        }
        if self.request_appeal_expiry.is_some() {
            fields.push("request_appeal_expiry");
        }
        if self.last_updated.is_some() {
            fields.push("last_updated");
        }
        fields
    }
}

/// A commit/reveal vote with a quorum threshold and for/against tallies.
///
/// `votes_for` and `votes_against` are monotonically non-decreasing
/// counters accumulated from vote-reveal events; they are never
/// overwritten with smaller values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    /// Poll identifier (equals the owning challenge id for challenge
    /// polls).
    pub poll_id: u64,

    /// Unix timestamp when the commit phase ends.
    pub commit_end: i64,

    /// Unix timestamp when the reveal phase ends.
    pub reveal_end: i64,

    /// Fraction of votes required for the challenged side to prevail.
    pub vote_quorum: U256,

    /// Cumulative tokens revealed in favor, in base units.
    pub votes_for: U256,

    /// Cumulative tokens revealed against, in base units.
    pub votes_against: U256,
}

impl Poll {
    /// True when the revealed tallies favor keeping the challenged item.
    pub fn passed(&self) -> bool {
        self.votes_for > self.votes_against
    }

    /// Apply a field-level patch.
    pub fn apply(&mut self, patch: &PollPatch) {
        if let Some(votes_for) = patch.votes_for {
            self.votes_for = votes_for;
        }
        if let Some(votes_against) = patch.votes_against {
            self.votes_against = votes_against;
        }
    }
}

/// Field-level partial update for [`Poll`].
///
/// Carries the new cumulative totals (current value plus the revealed
/// delta), computed by the voting sub-processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPatch {
    /// New cumulative votes-for total.
    pub votes_for: Option<U256>,

    /// New cumulative votes-against total.
    pub votes_against: Option<U256>,
}

impl PollPatch {
    /// Names of the fields this patch writes.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.votes_for.is_some() {
            fields.push("votes_for");
        }
        if self.votes_against.is_some() {
            fields.push("votes_against");
        }
        fields
    }
}

/// A request to override a poll outcome, itself subject to challenge.
///
/// Keyed by the originating challenge identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    /// Identifier of the challenge being appealed.
    pub challenge_id: u64,

    /// Account that requested the appeal.
    pub requester: Address,

    /// Fee paid to request the appeal, in base units.
    pub appeal_fee: U256,

    /// Free-text appeal statement.
    pub statement: String,

    /// Whether the appeal was granted.
    pub granted: bool,

    /// Identifier of the challenge raised against a granted appeal, if any.
    pub appeal_challenge_id: Option<u64>,

    /// Unix timestamp of the last state-changing event.
    pub last_updated: i64,
}

impl Appeal {
    /// Apply a field-level patch.
    pub fn apply(&mut self, patch: &AppealPatch) {
        if let Some(granted) = patch.granted {
            self.granted = granted;
        }
        if let Some(id) = patch.appeal_challenge_id {
            self.appeal_challenge_id = Some(id);
        }
        if let Some(last_updated) = patch.last_updated {
            self.last_updated = last_updated;
        }
    }
}

/// Field-level partial update for [`Appeal`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppealPatch {
    /// New granted flag.
    pub granted: Option<bool>,

    /// Challenge id raised against the granted appeal.
    pub appeal_challenge_id: Option<u64>,

    /// New last-updated timestamp.
    pub last_updated: Option<i64>,
}

impl AppealPatch {
    /// Names of the fields this patch writes.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.granted.is_some() {
            fields.push("granted");
        }
        if self.appeal_challenge_id.is_some() {
            fields.push("appeal_challenge_id");
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
    fn resolved_is_monotone() {
        let mut challenge = Challenge {
            challenge_id: 3,
            listing_address: Address::repeat_byte(0x11),
            statement: String::new(),
            reward_pool: U256::ZERO,
            challenger: Address::repeat_byte(0x22),
            resolved: false,
            stake: U256::from(100),
            total_tokens: U256::ZERO,
            request_appeal_expiry: None,
            poll: None,
            appeal: None,
            last_updated: 0,
        };

        challenge.apply(&ChallengePatch {
            resolved: Some(true),
            ..Default::default()
        });
        assert!(challenge.resolved);

        // A later patch cannot un-resolve.
        challenge.apply(&ChallengePatch {
            resolved: Some(false),
            ..Default::default()
        });
        assert!(challenge.resolved);
    }

    #[test]
    fn poll_passed_compares_tallies() {
        let mut poll = Poll {
            poll_id: 1,
            commit_end: 10,
            reveal_end: 20,
            vote_quorum: U256::from(50),
            votes_for: U256::from(10),
            votes_against: U256::from(10),
        };
        assert!(!poll.passed());

        poll.apply(&PollPatch {
            votes_for: Some(U256::from(11)),
            ..Default::default()
        });
        assert!(poll.passed());
    }
}
