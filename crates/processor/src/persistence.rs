//! Persistence ports consumed by the engine.
//!
//! One interface per entity family. Lookups return the distinguished
//! [`StoreError::NoResults`] sentinel on empty results; the engine treats
//! that value as a normal branch via [`optional`], never as a failure.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use thiserror::Error;

use crate::watermark::Watermark;
use tcr_core::{
    Appeal, AppealPatch, Challenge, ChallengeCriteria, ChallengePatch, ContentRevision,
    GovernanceEvent, GovernanceEventCriteria, GovernanceEventPatch, GovtParamProposal, Listing,
    ListingCriteria, ListingPatch, MultiSig, MultiSigOwner, ParamProposal, ParamProposalPatch,
    Poll, PollPatch, TokenPurchase, TokenPurchaseCriteria, TokenTransfer, TokenTransferCriteria,
};

/// Error surface of the persistence ports.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Distinguished "no results" sentinel. A valid branch, not a failure.
    #[error("no results")]
    NoResults,

    /// Backend failure (connectivity, constraint violation, corruption).
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Map the `NoResults` sentinel to `None`, keeping real failures.
pub fn optional<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NoResults) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Listing aggregate store.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Fetch a listing by its account address.
    async fn listing_by_address(&self, address: Address) -> Result<Listing, StoreError>;

    /// Fetch listings matching the criteria.
    async fn listings_by_criteria(
        &self,
        criteria: &ListingCriteria,
    ) -> Result<Vec<Listing>, StoreError>;

    /// Persist a new listing.
    async fn create_listing(&self, listing: &Listing) -> Result<(), StoreError>;

    /// Apply a field-level patch to an existing listing.
    async fn update_listing(
        &self,
        address: Address,
        patch: &ListingPatch,
    ) -> Result<(), StoreError>;

    /// Delete a listing.
    async fn delete_listing(&self, address: Address) -> Result<(), StoreError>;
}

/// Challenge aggregate store.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Fetch a challenge by identifier.
    async fn challenge_by_id(&self, challenge_id: u64) -> Result<Challenge, StoreError>;

    /// Fetch challenges matching the criteria.
    async fn challenges_by_criteria(
        &self,
        criteria: &ChallengeCriteria,
    ) -> Result<Vec<Challenge>, StoreError>;

    /// Persist a new challenge.
    async fn create_challenge(&self, challenge: &Challenge) -> Result<(), StoreError>;

    /// Apply a field-level patch to an existing challenge.
    async fn update_challenge(
        &self,
        challenge_id: u64,
        patch: &ChallengePatch,
    ) -> Result<(), StoreError>;
}

/// Poll aggregate store.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Fetch a poll by identifier.
    async fn poll_by_id(&self, poll_id: u64) -> Result<Poll, StoreError>;

    /// Persist a new poll.
    async fn create_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    /// Apply a field-level patch to an existing poll.
    async fn update_poll(&self, poll_id: u64, patch: &PollPatch) -> Result<(), StoreError>;
}

/// Appeal aggregate store.
#[async_trait]
pub trait AppealStore: Send + Sync {
    /// Fetch the appeal raised against a challenge.
    async fn appeal_by_challenge_id(&self, challenge_id: u64) -> Result<Appeal, StoreError>;

    /// Persist a new appeal.
    async fn create_appeal(&self, appeal: &Appeal) -> Result<(), StoreError>;

    /// Apply a field-level patch to an existing appeal.
    async fn update_appeal(
        &self,
        challenge_id: u64,
        patch: &AppealPatch,
    ) -> Result<(), StoreError>;
}

/// Parameter proposal store, covering both contract families.
#[async_trait]
pub trait ParamProposalStore: Send + Sync {
    /// Fetch a parameterizer proposal by identifier.
    async fn proposal_by_id(&self, prop_id: B256) -> Result<ParamProposal, StoreError>;

    /// Persist a new parameterizer proposal.
    async fn create_proposal(&self, proposal: &ParamProposal) -> Result<(), StoreError>;

    /// Apply a field-level patch to a parameterizer proposal.
    async fn update_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError>;

    /// Fetch a government proposal by identifier.
    async fn govt_proposal_by_id(&self, prop_id: B256) -> Result<GovtParamProposal, StoreError>;

    /// Persist a new government proposal.
    async fn create_govt_proposal(&self, proposal: &GovtParamProposal) -> Result<(), StoreError>;

    /// Apply a field-level patch to a government proposal.
    async fn update_govt_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError>;
}

/// Token movement store.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Fetch all purchases credited to an account.
    async fn purchases_by_purchaser(
        &self,
        purchaser: Address,
    ) -> Result<Vec<TokenPurchase>, StoreError>;

    /// Fetch purchases matching the criteria.
    async fn purchases_by_criteria(
        &self,
        criteria: &TokenPurchaseCriteria,
    ) -> Result<Vec<TokenPurchase>, StoreError>;

    /// Append a purchase record.
    async fn create_purchase(&self, purchase: &TokenPurchase) -> Result<(), StoreError>;

    /// Fetch transfers matching the criteria.
    async fn transfers_by_criteria(
        &self,
        criteria: &TokenTransferCriteria,
    ) -> Result<Vec<TokenTransfer>, StoreError>;

    /// Append a transfer record.
    async fn create_transfer(&self, transfer: &TokenTransfer) -> Result<(), StoreError>;
}

/// Governance audit trail store.
#[async_trait]
pub trait GovernanceEventStore: Send + Sync {
    /// Fetch audit records matching the criteria.
    async fn events_by_criteria(
        &self,
        criteria: &GovernanceEventCriteria,
    ) -> Result<Vec<GovernanceEvent>, StoreError>;

    /// Fetch an audit record by its source-log identity hash.
    async fn event_by_hash(&self, event_hash: B256) -> Result<GovernanceEvent, StoreError>;

    /// Append an audit record.
    async fn create_event(&self, event: &GovernanceEvent) -> Result<(), StoreError>;

    /// Refresh an audit record's last-updated timestamp.
    async fn update_event(
        &self,
        event_hash: B256,
        patch: &GovernanceEventPatch,
    ) -> Result<(), StoreError>;
}

/// Multisig wallet and ownership store.
#[async_trait]
pub trait MultiSigStore: Send + Sync {
    /// Fetch a wallet by address.
    async fn multi_sig_by_address(&self, address: Address) -> Result<MultiSig, StoreError>;

    /// Persist a new wallet.
    async fn create_multi_sig(&self, multi_sig: &MultiSig) -> Result<(), StoreError>;

    /// Fetch the owner memberships of a wallet.
    async fn owners(&self, address: Address) -> Result<Vec<MultiSigOwner>, StoreError>;

    /// Add an owner membership. Idempotent on replay.
    async fn add_owner(&self, owner: &MultiSigOwner) -> Result<(), StoreError>;

    /// Remove an owner membership by account identity.
    async fn remove_owner(
        &self,
        multi_sig_address: Address,
        owner_address: Address,
    ) -> Result<(), StoreError>;
}

/// Content revision store.
#[async_trait]
pub trait ContentRevisionStore: Send + Sync {
    /// Fetch a revision by its composite key.
    async fn revision(
        &self,
        listing_address: Address,
        content_id: u64,
        revision_id: u64,
    ) -> Result<ContentRevision, StoreError>;

    /// Fetch all revisions published on a listing.
    async fn revisions_by_listing(
        &self,
        listing_address: Address,
    ) -> Result<Vec<ContentRevision>, StoreError>;

    /// Persist a new revision.
    async fn create_revision(&self, revision: &ContentRevision) -> Result<(), StoreError>;
}

/// Watermark cursor store for the scheduling boundary.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Fetch the persisted watermark. `NoResults` until first save.
    async fn watermark(&self) -> Result<Watermark, StoreError>;

    /// Persist the watermark after a successful batch.
    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StoreError>;
}
