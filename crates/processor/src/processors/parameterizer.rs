//! Parameter-governance sub-processor.
//!
//! Handles both the parameterizer and the government contract families:
//! the same event names project into separate proposal aggregates.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{claims, require, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{optional, ParamProposalStore, PollStore};
use tcr_core::{ContractKind, GovtParamProposal, ParamProposal, ParamProposalPatch, Poll};

const PARAM_EVENTS: &[&str] = &[
    "ReparameterizationProposal",
    "ProposalAccepted",
    "ProposalExpired",
    "NewChallenge",
    "ChallengeFailed",
    "ChallengeSucceeded",
];

const KINDS: &[ContractKind] = &[ContractKind::Parameterizer, ContractKind::Government];

/// Sub-processor for parameter-governance proposals.
pub struct ParameterizerProcessor {
    proposals: Arc<dyn ParamProposalStore>,
    polls: Arc<dyn PollStore>,
}

impl ParameterizerProcessor {
    /// Create a parameterizer processor over the given stores.
    pub fn new(proposals: Arc<dyn ParamProposalStore>, polls: Arc<dyn PollStore>) -> Self {
        Self { proposals, polls }
    }

    async fn apply_proposal(&self, event: &Event) -> Result<(), ProcessorError> {
        let prop_id = event.payload.bytes32("propID")?;
        let name = event.payload.str_("name")?.to_string();
        let value = event.payload.uint("value")?;
        let proposer = event.payload.address("proposer")?;

        match event.contract_kind {
            ContractKind::Government => {
                if optional(self.proposals.govt_proposal_by_id(prop_id).await)?.is_some() {
                    debug!(prop_id = %prop_id, "government proposal replay");
                    return Ok(());
                }
                let proposal = GovtParamProposal {
                    prop_id,
                    name,
                    value,
                    proposer,
                    accepted: false,
                    expired: false,
                    last_updated: event.timestamp,
                };
                self.proposals.create_govt_proposal(&proposal).await?;
            }
            _ => {
                if optional(self.proposals.proposal_by_id(prop_id).await)?.is_some() {
                    debug!(prop_id = %prop_id, "proposal replay, record already exists");
                    return Ok(());
                }
                let proposal = ParamProposal {
                    prop_id,
                    name,
                    value,
                    deposit: event.payload.opt_uint("deposit")?.unwrap_or(U256::ZERO),
                    proposer,
                    app_expiry: match event.payload.opt_uint("appEndDate")? {
                        Some(expiry) => Some(expiry.try_into().unwrap_or(i64::MAX)),
                        None => None,
                    },
                    challenge_id: None,
                    accepted: false,
                    expired: false,
                    last_updated: event.timestamp,
                };
                self.proposals.create_proposal(&proposal).await?;
            }
        }
        Ok(())
    }

    /// Apply a terminal-state patch to the proposal named by the event.
    ///
    /// Re-application is a no-op: an already-accepted proposal is not
    /// toggled by a replayed `ProposalAccepted`.
    async fn apply_terminal(
        &self,
        event: &Event,
        patch: ParamProposalPatch,
    ) -> Result<(), ProcessorError> {
        let prop_id = event.payload.bytes32("propID")?;
        match event.contract_kind {
            ContractKind::Government => {
                require(
                    self.proposals.govt_proposal_by_id(prop_id).await,
                    "government proposal",
                    prop_id,
                )?;
                self.proposals.update_govt_proposal(prop_id, &patch).await?;
            }
            _ => {
                require(
                    self.proposals.proposal_by_id(prop_id).await,
                    "proposal",
                    prop_id,
                )?;
                self.proposals.update_proposal(prop_id, &patch).await?;
            }
        }
        Ok(())
    }

    /// Mirror of the registry challenge pattern, against a proposal.
    async fn apply_new_challenge(&self, event: &Event) -> Result<(), ProcessorError> {
        let prop_id = event.payload.bytes32("propID")?;
        let challenge_id = event.payload.uint64("challengeID")?;

        require(
            self.proposals.proposal_by_id(prop_id).await,
            "proposal",
            prop_id,
        )?;

        if let (Some(commit), Some(reveal)) = (
            event.payload.opt_uint("commitEndDate")?,
            event.payload.opt_uint("revealEndDate")?,
        ) {
            if optional(self.polls.poll_by_id(challenge_id).await)?.is_none() {
                let poll = Poll {
                    poll_id: challenge_id,
                    commit_end: commit.try_into().unwrap_or(i64::MAX),
                    reveal_end: reveal.try_into().unwrap_or(i64::MAX),
                    vote_quorum: event.payload.opt_uint("voteQuorum")?.unwrap_or(U256::ZERO),
                    votes_for: U256::ZERO,
                    votes_against: U256::ZERO,
                };
                self.polls.create_poll(&poll).await?;
            }
        }

        self.proposals
            .update_proposal(
                prop_id,
                &ParamProposalPatch {
                    challenge_id: Some(Some(challenge_id)),
                    last_updated: Some(event.timestamp),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ParameterizerProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        PARAM_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }

        match event.base_name() {
            "ReparameterizationProposal" => self.apply_proposal(event).await?,
            "ProposalAccepted" => {
                self.apply_terminal(
                    event,
                    ParamProposalPatch {
                        accepted: Some(true),
                        last_updated: Some(event.timestamp),
                        ..Default::default()
                    },
                )
                .await?
            }
            "ProposalExpired" => {
                self.apply_terminal(
                    event,
                    ParamProposalPatch {
                        expired: Some(true),
                        last_updated: Some(event.timestamp),
                        ..Default::default()
                    },
                )
                .await?
            }
            "NewChallenge" => self.apply_new_challenge(event).await?,
            // A failed challenge leaves the proposal pending; a successful
            // one rejects it. Both close the challenge reference.
            "ChallengeFailed" => {
                self.apply_terminal(
                    event,
                    ParamProposalPatch {
                        challenge_id: Some(None),
                        last_updated: Some(event.timestamp),
                        ..Default::default()
                    },
                )
                .await?
            }
            "ChallengeSucceeded" => {
                self.apply_terminal(
                    event,
                    ParamProposalPatch {
                        expired: Some(true),
                        challenge_id: Some(None),
                        last_updated: Some(event.timestamp),
                        ..Default::default()
                    },
                )
                .await?
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
