//! In-memory implementation of every persistence port.
//!
//! Backs the engine and sub-processor tests; also usable as a throwaway
//! backend for local experiments. Not durable and not meant for
//! production.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::persistence::{
    AppealStore, ChallengeStore, ContentRevisionStore, CursorStore, GovernanceEventStore,
    ListingStore, MultiSigStore, ParamProposalStore, PollStore, StoreError, TokenStore,
};
use crate::watermark::Watermark;
use tcr_core::{
    Appeal, AppealPatch, Challenge, ChallengeCriteria, ChallengePatch, ContentRevision,
    GovernanceEvent, GovernanceEventCriteria, GovernanceEventPatch, GovtParamProposal, Listing,
    ListingCriteria, ListingPatch, MultiSig, MultiSigOwner, ParamProposal, ParamProposalPatch,
    Poll, PollPatch, TokenPurchase, TokenPurchaseCriteria, TokenTransfer, TokenTransferCriteria,
};

#[derive(Default)]
struct State {
    listings: HashMap<Address, Listing>,
    challenges: HashMap<u64, Challenge>,
    polls: HashMap<u64, Poll>,
    appeals: HashMap<u64, Appeal>,
    proposals: HashMap<B256, ParamProposal>,
    govt_proposals: HashMap<B256, GovtParamProposal>,
    purchases: Vec<TokenPurchase>,
    transfers: Vec<TokenTransfer>,
    governance_events: Vec<GovernanceEvent>,
    multi_sigs: HashMap<Address, MultiSig>,
    owners: Vec<MultiSigOwner>,
    revisions: HashMap<(Address, u64, u64), ContentRevision>,
    watermark: Option<Watermark>,
}

/// In-memory store implementing every persistence port.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, offset: u32, count: u32) -> Vec<T> {
    let iter = items.into_iter().skip(offset as usize);
    if count == 0 {
        iter.collect()
    } else {
        iter.take(count as usize).collect()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn listing_by_address(&self, address: Address) -> Result<Listing, StoreError> {
        self.state
            .read()
            .await
            .listings
            .get(&address)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn listings_by_criteria(
        &self,
        criteria: &ListingCriteria,
    ) -> Result<Vec<Listing>, StoreError> {
        let state = self.state.read().await;
        let mut matched: Vec<Listing> = state
            .listings
            .values()
            .filter(|l| !criteria.whitelisted_only || l.whitelisted)
            .filter(|l| !criteria.active_challenge || l.challenge_id.is_some())
            .filter(|l| match criteria.created_from {
                Some(from) => l.application_date.is_some_and(|d| d >= from),
                None => true,
            })
            .filter(|l| match criteria.created_before {
                Some(before) => l.application_date.is_some_and(|d| d < before),
                None => true,
            })
            .cloned()
            .collect();
        matched.sort_by_key(|l| l.address);
        let matched = paginate(matched, criteria.offset, criteria.count);
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn create_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .listings
            .insert(listing.address, listing.clone());
        Ok(())
    }

    async fn update_listing(
        &self,
        address: Address,
        patch: &ListingPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let listing = state.listings.get_mut(&address).ok_or(StoreError::NoResults)?;
        listing.apply(patch);
        Ok(())
    }

    async fn delete_listing(&self, address: Address) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .listings
            .remove(&address)
            .map(|_| ())
            .ok_or(StoreError::NoResults)
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn challenge_by_id(&self, challenge_id: u64) -> Result<Challenge, StoreError> {
        self.state
            .read()
            .await
            .challenges
            .get(&challenge_id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn challenges_by_criteria(
        &self,
        criteria: &ChallengeCriteria,
    ) -> Result<Vec<Challenge>, StoreError> {
        let state = self.state.read().await;
        let mut matched: Vec<Challenge> = state
            .challenges
            .values()
            .filter(|c| {
                criteria
                    .listing_address
                    .is_none_or(|addr| c.listing_address == addr)
            })
            .filter(|c| criteria.resolved.is_none_or(|r| c.resolved == r))
            .cloned()
            .collect();
        matched.sort_by_key(|c| c.challenge_id);
        let matched = paginate(matched, criteria.offset, criteria.count);
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn create_challenge(&self, challenge: &Challenge) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .challenges
            .insert(challenge.challenge_id, challenge.clone());
        Ok(())
    }

    async fn update_challenge(
        &self,
        challenge_id: u64,
        patch: &ChallengePatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let challenge = state
            .challenges
            .get_mut(&challenge_id)
            .ok_or(StoreError::NoResults)?;
        challenge.apply(patch);
        Ok(())
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn poll_by_id(&self, poll_id: u64) -> Result<Poll, StoreError> {
        self.state
            .read()
            .await
            .polls
            .get(&poll_id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .polls
            .insert(poll.poll_id, poll.clone());
        Ok(())
    }

    async fn update_poll(&self, poll_id: u64, patch: &PollPatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let poll = state.polls.get_mut(&poll_id).ok_or(StoreError::NoResults)?;
        poll.apply(patch);
        Ok(())
    }
}

#[async_trait]
impl AppealStore for MemoryStore {
    async fn appeal_by_challenge_id(&self, challenge_id: u64) -> Result<Appeal, StoreError> {
        self.state
            .read()
            .await
            .appeals
            .get(&challenge_id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_appeal(&self, appeal: &Appeal) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .appeals
            .insert(appeal.challenge_id, appeal.clone());
        Ok(())
    }

    async fn update_appeal(
        &self,
        challenge_id: u64,
        patch: &AppealPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let appeal = state
            .appeals
            .get_mut(&challenge_id)
            .ok_or(StoreError::NoResults)?;
        appeal.apply(patch);
        Ok(())
    }
}

#[async_trait]
impl ParamProposalStore for MemoryStore {
    async fn proposal_by_id(&self, prop_id: B256) -> Result<ParamProposal, StoreError> {
        self.state
            .read()
            .await
            .proposals
            .get(&prop_id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_proposal(&self, proposal: &ParamProposal) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .proposals
            .insert(proposal.prop_id, proposal.clone());
        Ok(())
    }

    async fn update_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let proposal = state
            .proposals
            .get_mut(&prop_id)
            .ok_or(StoreError::NoResults)?;
        proposal.apply(patch);
        Ok(())
    }

    async fn govt_proposal_by_id(&self, prop_id: B256) -> Result<GovtParamProposal, StoreError> {
        self.state
            .read()
            .await
            .govt_proposals
            .get(&prop_id)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_govt_proposal(&self, proposal: &GovtParamProposal) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .govt_proposals
            .insert(proposal.prop_id, proposal.clone());
        Ok(())
    }

    async fn update_govt_proposal(
        &self,
        prop_id: B256,
        patch: &ParamProposalPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let proposal = state
            .govt_proposals
            .get_mut(&prop_id)
            .ok_or(StoreError::NoResults)?;
        proposal.apply(patch);
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn purchases_by_purchaser(
        &self,
        purchaser: Address,
    ) -> Result<Vec<TokenPurchase>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<TokenPurchase> = state
            .purchases
            .iter()
            .filter(|p| p.purchaser == purchaser)
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn purchases_by_criteria(
        &self,
        criteria: &TokenPurchaseCriteria,
    ) -> Result<Vec<TokenPurchase>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<TokenPurchase> = state
            .purchases
            .iter()
            .filter(|p| criteria.purchaser.is_none_or(|a| p.purchaser == a))
            .filter(|p| criteria.created_from.is_none_or(|f| p.purchase_date >= f))
            .filter(|p| criteria.created_before.is_none_or(|b| p.purchase_date < b))
            .cloned()
            .collect();
        let matched = paginate(matched, criteria.offset, criteria.count);
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn create_purchase(&self, purchase: &TokenPurchase) -> Result<(), StoreError> {
        self.state.write().await.purchases.push(purchase.clone());
        Ok(())
    }

    async fn transfers_by_criteria(
        &self,
        criteria: &TokenTransferCriteria,
    ) -> Result<Vec<TokenTransfer>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<TokenTransfer> = state
            .transfers
            .iter()
            .filter(|t| criteria.to_address.is_none_or(|a| t.to_address == a))
            .filter(|t| criteria.from_address.is_none_or(|a| t.from_address == a))
            .cloned()
            .collect();
        let matched = paginate(matched, criteria.offset, criteria.count);
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn create_transfer(&self, transfer: &TokenTransfer) -> Result<(), StoreError> {
        self.state.write().await.transfers.push(transfer.clone());
        Ok(())
    }
}

#[async_trait]
impl GovernanceEventStore for MemoryStore {
    async fn events_by_criteria(
        &self,
        criteria: &GovernanceEventCriteria,
    ) -> Result<Vec<GovernanceEvent>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<GovernanceEvent> = state
            .governance_events
            .iter()
            .filter(|e| criteria.listing_address.is_none_or(|a| e.listing_address == a))
            .filter(|e| criteria.created_from.is_none_or(|f| e.created >= f))
            .filter(|e| criteria.created_before.is_none_or(|b| e.created < b))
            .filter(|e| {
                criteria
                    .event_type
                    .as_deref()
                    .is_none_or(|t| e.event_type == t)
            })
            .cloned()
            .collect();
        let matched = paginate(matched, criteria.offset, criteria.count);
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn event_by_hash(&self, event_hash: B256) -> Result<GovernanceEvent, StoreError> {
        self.state
            .read()
            .await
            .governance_events
            .iter()
            .find(|e| e.event_hash == event_hash)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_event(&self, event: &GovernanceEvent) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .governance_events
            .push(event.clone());
        Ok(())
    }

    async fn update_event(
        &self,
        event_hash: B256,
        patch: &GovernanceEventPatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let event = state
            .governance_events
            .iter_mut()
            .find(|e| e.event_hash == event_hash)
            .ok_or(StoreError::NoResults)?;
        event.apply(patch);
        Ok(())
    }
}

#[async_trait]
impl MultiSigStore for MemoryStore {
    async fn multi_sig_by_address(&self, address: Address) -> Result<MultiSig, StoreError> {
        self.state
            .read()
            .await
            .multi_sigs
            .get(&address)
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn create_multi_sig(&self, multi_sig: &MultiSig) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .multi_sigs
            .insert(multi_sig.address, multi_sig.clone());
        Ok(())
    }

    async fn owners(&self, address: Address) -> Result<Vec<MultiSigOwner>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<MultiSigOwner> = state
            .owners
            .iter()
            .filter(|o| o.multi_sig_address == address)
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn add_owner(&self, owner: &MultiSigOwner) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let exists = state.owners.iter().any(|o| {
            o.multi_sig_address == owner.multi_sig_address
                && o.owner_address == owner.owner_address
        });
        if !exists {
            state.owners.push(owner.clone());
        }
        Ok(())
    }

    async fn remove_owner(
        &self,
        multi_sig_address: Address,
        owner_address: Address,
    ) -> Result<(), StoreError> {
        self.state.write().await.owners.retain(|o| {
            !(o.multi_sig_address == multi_sig_address && o.owner_address == owner_address)
        });
        Ok(())
    }
}

#[async_trait]
impl ContentRevisionStore for MemoryStore {
    async fn revision(
        &self,
        listing_address: Address,
        content_id: u64,
        revision_id: u64,
    ) -> Result<ContentRevision, StoreError> {
        self.state
            .read()
            .await
            .revisions
            .get(&(listing_address, content_id, revision_id))
            .cloned()
            .ok_or(StoreError::NoResults)
    }

    async fn revisions_by_listing(
        &self,
        listing_address: Address,
    ) -> Result<Vec<ContentRevision>, StoreError> {
        let state = self.state.read().await;
        let matched: Vec<ContentRevision> = state
            .revisions
            .values()
            .filter(|r| r.listing_address == listing_address)
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(StoreError::NoResults);
        }
        Ok(matched)
    }

    async fn create_revision(&self, revision: &ContentRevision) -> Result<(), StoreError> {
        self.state.write().await.revisions.insert(
            (
                revision.listing_address,
                revision.content_id,
                revision.revision_id,
            ),
            revision.clone(),
        );
        Ok(())
    }
}

#[async_trait]
impl CursorStore for MemoryStore {
    async fn watermark(&self) -> Result<Watermark, StoreError> {
        self.state
            .read()
            .await
            .watermark
            .clone()
            .ok_or(StoreError::NoResults)
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StoreError> {
        self.state.write().await.watermark = Some(watermark.clone());
        Ok(())
    }
}
