//! Commit/reveal voting sub-processor.

use alloy_primitives::U256;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{claims, require, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{optional, PollStore};
use tcr_core::{ContractKind, Poll, PollPatch};

const VOTING_EVENTS: &[&str] = &["PollCreated", "VoteCommitted", "VoteRevealed"];

const KINDS: &[ContractKind] = &[ContractKind::Voting];

/// Reveal choice value meaning a vote in favor of the challenged item.
const CHOICE_FOR: u64 = 1;

/// Sub-processor for the commit/reveal voting contract family.
pub struct VotingProcessor {
    polls: Arc<dyn PollStore>,
}

impl VotingProcessor {
    /// Create a voting processor over the poll store.
    pub fn new(polls: Arc<dyn PollStore>) -> Self {
        Self { polls }
    }

    async fn apply_poll_created(&self, event: &Event) -> Result<(), ProcessorError> {
        let poll_id = event.payload.uint64("pollID")?;
        if optional(self.polls.poll_by_id(poll_id).await)?.is_some() {
            debug!(poll_id, "poll replay, record already exists");
            return Ok(());
        }

        let poll = Poll {
            poll_id,
            commit_end: event.payload.timestamp("commitEndDate")?,
            reveal_end: event.payload.timestamp("revealEndDate")?,
            vote_quorum: event.payload.uint("voteQuorum")?,
            votes_for: U256::ZERO,
            votes_against: U256::ZERO,
        };
        self.polls.create_poll(&poll).await?;
        Ok(())
    }

    /// Add the revealed tokens to the chosen side's running total.
    ///
    /// The tallies are accumulated, never replaced: the patch carries
    /// `current + delta` for exactly one counter.
    async fn apply_vote_revealed(&self, event: &Event) -> Result<(), ProcessorError> {
        let poll_id = event.payload.uint64("pollID")?;
        let num_tokens = event.payload.uint("numTokens")?;
        let choice = event.payload.uint64("choice")?;

        let poll = require(self.polls.poll_by_id(poll_id).await, "poll", poll_id)?;

        let patch = if choice == CHOICE_FOR {
            PollPatch {
                votes_for: Some(poll.votes_for + num_tokens),
                ..Default::default()
            }
        } else {
            PollPatch {
                votes_against: Some(poll.votes_against + num_tokens),
                ..Default::default()
            }
        };
        self.polls.update_poll(poll_id, &patch).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for VotingProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        VOTING_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }

        match event.base_name() {
            "PollCreated" => self.apply_poll_created(event).await?,
            "VoteRevealed" => self.apply_vote_revealed(event).await?,
            // Commits carry no aggregate change; tallies only move on
            // reveal.
            "VoteCommitted" => {
                debug!(
                    poll_id = event.payload.uint64("pollID").ok(),
                    "vote committed"
                );
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
