//! Registry-governance sub-processor.
//!
//! Projects the listing application/challenge/appeal lifecycle and appends
//! a governance audit record for every claimed event.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{claims, require, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{
    optional, AppealStore, ChallengeStore, GovernanceEventStore, ListingStore, PollStore,
};
use tcr_core::{
    Appeal, AppealPatch, Challenge, ChallengePatch, ContractKind, GovernanceEvent,
    GovernanceEventPatch, GovernanceState, Listing, ListingPatch, Poll,
};

const REGISTRY_EVENTS: &[&str] = &[
    "Application",
    "Deposit",
    "Withdrawal",
    "ApplicationWhitelisted",
    "ApplicationRemoved",
    "ListingRemoved",
    "ListingWithdrawn",
    "TouchAndRemoved",
    "NewChallenge",
    "ChallengeFailed",
    "ChallengeSucceeded",
    "AppealRequested",
    "AppealGranted",
    "GrantedAppealChallenged",
    "GrantedAppealConfirmed",
    "GrantedAppealOverturned",
];

const KINDS: &[ContractKind] = &[ContractKind::Registry];

/// Payload keys tried, in order, when attributing an audit record sender.
const SENDER_KEYS: &[&str] = &["applicant", "challenger", "requester", "owner", "sender"];

/// Sub-processor for the token-curated registry contract family.
pub struct RegistryProcessor {
    listings: Arc<dyn ListingStore>,
    challenges: Arc<dyn ChallengeStore>,
    polls: Arc<dyn PollStore>,
    appeals: Arc<dyn AppealStore>,
    audit: Arc<dyn GovernanceEventStore>,
}

impl RegistryProcessor {
    /// Create a registry processor over the given stores.
    pub fn new(
        listings: Arc<dyn ListingStore>,
        challenges: Arc<dyn ChallengeStore>,
        polls: Arc<dyn PollStore>,
        appeals: Arc<dyn AppealStore>,
        audit: Arc<dyn GovernanceEventStore>,
    ) -> Self {
        Self {
            listings,
            challenges,
            polls,
            appeals,
            audit,
        }
    }

    async fn apply_application(&self, event: &Event) -> Result<Address, ProcessorError> {
        let address = event.payload.address("listingAddress")?;
        let applicant = event.payload.address("applicant")?;
        let deposit = event.payload.uint("deposit")?;
        let app_expiry = event.payload.timestamp("appEndDate")?;
        let charter_uri = event.payload.opt_str("data")?.unwrap_or_default();

        if optional(self.listings.listing_by_address(address).await)?.is_some() {
            debug!(listing = %address, "application replay, listing already exists");
            return Ok(address);
        }

        let listing = Listing {
            address,
            name: String::new(),
            whitelisted: false,
            state: GovernanceState::Applied,
            url: String::new(),
            charter_uri: charter_uri.to_string(),
            owner_addresses: vec![applicant],
            contributor_addresses: Vec::new(),
            application_date: Some(event.timestamp),
            approval_date: None,
            last_updated: event.timestamp,
            challenge_id: None,
            app_expiry: Some(app_expiry),
            unstaked_deposit: Some(deposit),
        };
        self.listings.create_listing(&listing).await?;
        Ok(address)
    }

    async fn apply_new_challenge(&self, event: &Event) -> Result<Address, ProcessorError> {
        let address = event.payload.address("listingAddress")?;
        let challenge_id = event.payload.uint64("challengeID")?;
        let challenger = event.payload.address("challenger")?;
        let statement = event.payload.opt_str("data")?.unwrap_or_default().to_string();
        let stake = event.payload.opt_uint("stake")?.unwrap_or(U256::ZERO);

        require(
            self.listings.listing_by_address(address).await,
            "listing",
            address,
        )?;

        // The challenge poll shares the challenge identifier.
        let poll = match (
            event.payload.opt_uint("commitEndDate")?,
            event.payload.opt_uint("revealEndDate")?,
        ) {
            (Some(commit), Some(reveal)) => Some(Poll {
                poll_id: challenge_id,
                commit_end: commit.try_into().unwrap_or(i64::MAX),
                reveal_end: reveal.try_into().unwrap_or(i64::MAX),
                vote_quorum: event.payload.opt_uint("voteQuorum")?.unwrap_or(U256::ZERO),
                votes_for: U256::ZERO,
                votes_against: U256::ZERO,
            }),
            _ => None,
        };

        if optional(self.challenges.challenge_by_id(challenge_id).await)?.is_none() {
            let challenge = Challenge {
                challenge_id,
                listing_address: address,
                statement,
                reward_pool: U256::ZERO,
                challenger,
                resolved: false,
                stake,
                total_tokens: U256::ZERO,
                request_appeal_expiry: None,
                poll: poll.clone(),
                appeal: None,
                last_updated: event.timestamp,
            };
            self.challenges.create_challenge(&challenge).await?;
        } else {
            debug!(challenge_id, "challenge replay, record already exists");
        }

        if let Some(poll) = poll {
            if optional(self.polls.poll_by_id(poll.poll_id).await)?.is_none() {
                self.polls.create_poll(&poll).await?;
            }
        }

        self.listings
            .update_listing(
                address,
                &ListingPatch {
                    state: Some(GovernanceState::Challenged),
                    challenge_id: Some(Some(challenge_id)),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(address)
    }

    /// Shared resolution for `ChallengeFailed` / `ChallengeSucceeded` and
    /// the appeal-overturn variants. `survives` is the final verdict on
    /// the listing.
    async fn resolve_challenge(
        &self,
        event: &Event,
        challenge: &Challenge,
        survives: bool,
    ) -> Result<Address, ProcessorError> {
        self.challenges
            .update_challenge(
                challenge.challenge_id,
                &ChallengePatch {
                    resolved: Some(true),
                    reward_pool: event.payload.opt_uint("rewardPool")?,
                    total_tokens: event.payload.opt_uint("totalTokens")?,
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;

        let (whitelisted, state) = if survives {
            (true, GovernanceState::AppWhitelisted)
        } else {
            (false, GovernanceState::Removed)
        };
        self.listings
            .update_listing(
                challenge.listing_address,
                &ListingPatch {
                    whitelisted: Some(whitelisted),
                    state: Some(state),
                    challenge_id: Some(None),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(challenge.listing_address)
    }

    async fn apply_challenge_outcome(
        &self,
        event: &Event,
        survives: bool,
    ) -> Result<Address, ProcessorError> {
        let challenge_id = event.payload.uint64("challengeID")?;
        let challenge = require(
            self.challenges.challenge_by_id(challenge_id).await,
            "challenge",
            challenge_id,
        )?;
        if challenge.resolved {
            debug!(challenge_id, "challenge already resolved, replay");
            return Ok(challenge.listing_address);
        }
        self.resolve_challenge(event, &challenge, survives).await
    }

    /// A granted appeal either stands (`Confirmed`, overturning the poll
    /// outcome) or is itself overturned (`Overturned`, restoring the poll
    /// outcome). The final verdict is derived from the stored tallies.
    async fn apply_appeal_outcome(
        &self,
        event: &Event,
        appeal_stands: bool,
    ) -> Result<Address, ProcessorError> {
        let challenge_id = event.payload.uint64("challengeID")?;
        let challenge = require(
            self.challenges.challenge_by_id(challenge_id).await,
            "challenge",
            challenge_id,
        )?;
        if challenge.resolved {
            debug!(challenge_id, "challenge already resolved, replay");
            return Ok(challenge.listing_address);
        }
        let poll = require(
            self.polls.poll_by_id(challenge_id).await,
            "poll",
            challenge_id,
        )?;
        let survives = if appeal_stands {
            !poll.passed()
        } else {
            poll.passed()
        };
        self.resolve_challenge(event, &challenge, survives).await
    }

    async fn apply_listing_state(
        &self,
        event: &Event,
        state: GovernanceState,
        whitelisted: bool,
    ) -> Result<Address, ProcessorError> {
        let address = event.payload.address("listingAddress")?;
        require(
            self.listings.listing_by_address(address).await,
            "listing",
            address,
        )?;

        let approval_date = match state {
            GovernanceState::AppWhitelisted => Some(event.timestamp),
            _ => None,
        };
        self.listings
            .update_listing(
                address,
                &ListingPatch {
                    whitelisted: Some(whitelisted),
                    state: Some(state),
                    approval_date,
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(address)
    }

    async fn apply_deposit_total(&self, event: &Event) -> Result<Address, ProcessorError> {
        let address = event.payload.address("listingAddress")?;
        let new_total = event.payload.uint("newTotal")?;
        require(
            self.listings.listing_by_address(address).await,
            "listing",
            address,
        )?;
        self.listings
            .update_listing(
                address,
                &ListingPatch {
                    unstaked_deposit: Some(new_total),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(address)
    }

    async fn apply_appeal_requested(&self, event: &Event) -> Result<Address, ProcessorError> {
        let challenge_id = event.payload.uint64("challengeID")?;
        let requester = event.payload.address("requester")?;
        let appeal_fee = event.payload.uint("appealFeePaid")?;

        let challenge = require(
            self.challenges.challenge_by_id(challenge_id).await,
            "challenge",
            challenge_id,
        )?;

        if optional(self.appeals.appeal_by_challenge_id(challenge_id).await)?.is_none() {
            let appeal = Appeal {
                challenge_id,
                requester,
                appeal_fee,
                statement: event.payload.opt_str("data")?.unwrap_or_default().to_string(),
                granted: false,
                appeal_challenge_id: None,
                last_updated: event.timestamp,
            };
            self.appeals.create_appeal(&appeal).await?;
        } else {
            debug!(challenge_id, "appeal replay, record already exists");
        }
        Ok(challenge.listing_address)
    }

    async fn apply_appeal_granted(&self, event: &Event) -> Result<Address, ProcessorError> {
        let challenge_id = event.payload.uint64("challengeID")?;
        let challenge = require(
            self.challenges.challenge_by_id(challenge_id).await,
            "challenge",
            challenge_id,
        )?;
        require(
            self.appeals.appeal_by_challenge_id(challenge_id).await,
            "appeal",
            challenge_id,
        )?;
        self.appeals
            .update_appeal(
                challenge_id,
                &AppealPatch {
                    granted: Some(true),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(challenge.listing_address)
    }

    async fn apply_appeal_challenged(&self, event: &Event) -> Result<Address, ProcessorError> {
        let challenge_id = event.payload.uint64("challengeID")?;
        let appeal_challenge_id = event.payload.uint64("appealChallengeID")?;
        let challenge = require(
            self.challenges.challenge_by_id(challenge_id).await,
            "challenge",
            challenge_id,
        )?;
        require(
            self.appeals.appeal_by_challenge_id(challenge_id).await,
            "appeal",
            challenge_id,
        )?;
        self.appeals
            .update_appeal(
                challenge_id,
                &AppealPatch {
                    appeal_challenge_id: Some(appeal_challenge_id),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(challenge.listing_address)
    }

    /// Append (or refresh, on replay) the audit record for a claimed event.
    async fn record_audit(
        &self,
        event: &Event,
        listing_address: Address,
    ) -> Result<(), ProcessorError> {
        let event_hash = event.event_hash();
        if optional(self.audit.event_by_hash(event_hash).await)?.is_some() {
            self.audit
                .update_event(
                    event_hash,
                    &GovernanceEventPatch {
                        last_updated: Some(event.timestamp),
                    },
                )
                .await?;
            return Ok(());
        }

        // Attribute the record to the first account-bearing payload field,
        // falling back to the emitting contract.
        let mut sender = event.contract_address;
        for &key in SENDER_KEYS {
            if let Some(addr) = event.payload.opt_address(key)? {
                sender = addr;
                break;
            }
        }

        let record = GovernanceEvent {
            listing_address,
            sender,
            metadata: event.payload.render_all(),
            event_type: event.base_name().to_string(),
            created: event.timestamp,
            last_updated: event.timestamp,
            provenance: event.provenance,
            event_hash,
        };
        self.audit.create_event(&record).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for RegistryProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        REGISTRY_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }

        let listing_address = match event.base_name() {
            "Application" => self.apply_application(event).await?,
            "NewChallenge" => self.apply_new_challenge(event).await?,
            "ChallengeFailed" => self.apply_challenge_outcome(event, true).await?,
            "ChallengeSucceeded" => self.apply_challenge_outcome(event, false).await?,
            "ApplicationWhitelisted" => {
                self.apply_listing_state(event, GovernanceState::AppWhitelisted, true)
                    .await?
            }
            "ApplicationRemoved" => {
                self.apply_listing_state(event, GovernanceState::AppRemoved, false)
                    .await?
            }
            "ListingRemoved" | "TouchAndRemoved" => {
                self.apply_listing_state(event, GovernanceState::Removed, false)
                    .await?
            }
            "ListingWithdrawn" => {
                self.apply_listing_state(event, GovernanceState::Withdrawn, false)
                    .await?
            }
            "Deposit" | "Withdrawal" => self.apply_deposit_total(event).await?,
            "AppealRequested" => self.apply_appeal_requested(event).await?,
            "AppealGranted" => self.apply_appeal_granted(event).await?,
            "GrantedAppealChallenged" => self.apply_appeal_challenged(event).await?,
            "GrantedAppealConfirmed" => self.apply_appeal_outcome(event, true).await?,
            "GrantedAppealOverturned" => self.apply_appeal_outcome(event, false).await?,
            other => {
                // Unreachable given the membership check above.
                debug!(name = other, "registry processor saw unknown event name");
                return Ok(false);
            }
        };

        self.record_audit(event, listing_address).await?;
        Ok(true)
    }
}
