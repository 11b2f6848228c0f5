//! End-to-end engine tests over the in-memory store.
//!
//! Each test drives ordered batches through a fully wired engine and
//! asserts on the projected aggregate state.

use alloy_primitives::{Address, B256, U256};
use std::sync::Arc;
use tokio::sync::Mutex;

use tcr_core::{ContractKind, EventProvenance, GovernanceState};
use tcr_processor::engine::Engine;
use tcr_processor::error::EngineError;
use tcr_processor::event::{Event, EventPayload, PayloadValue};
use tcr_processor::memory::MemoryStore;
use tcr_processor::persistence::{
    optional, ChallengeStore, ContentRevisionStore, CursorStore, GovernanceEventStore,
    ListingStore, MultiSigStore, ParamProposalStore, PollStore, TokenStore,
};
use tcr_processor::processors::{
    ContentProcessor, EventHandler, MultiSigProcessor, ParameterizerProcessor, RegistryProcessor,
    TokenProcessor, VotingProcessor,
};
use tcr_processor::publisher::{NoopPublisher, Publisher};
use tcr_processor::scraper::Keccak256Hasher;
use tcr_processor::watermark::Watermark;

const LISTING: Address = Address::repeat_byte(0x11);
const APPLICANT: Address = Address::repeat_byte(0x22);
const CHALLENGER: Address = Address::repeat_byte(0x33);
const WALLET: Address = Address::repeat_byte(0x44);

fn engine_over(store: &Arc<MemoryStore>) -> Engine {
    let publisher: Arc<dyn Publisher> = Arc::new(NoopPublisher);
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(RegistryProcessor::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        )),
        Arc::new(VotingProcessor::new(store.clone())),
        Arc::new(ParameterizerProcessor::new(store.clone(), store.clone())),
        Arc::new(ContentProcessor::new(
            store.clone(),
            Arc::new(Keccak256Hasher),
            None,
        )),
        Arc::new(TokenProcessor::new(store.clone())),
        Arc::new(MultiSigProcessor::new(store.clone(), publisher.clone())),
    ];
    Engine::new(handlers, publisher, Arc::new(Mutex::new(()))).unwrap()
}

fn event(
    kind: ContractKind,
    name: &str,
    contract_address: Address,
    timestamp: i64,
    log_index: u64,
    payload: EventPayload,
) -> Event {
    Event {
        contract_kind: kind,
        contract_address,
        name: name.to_string(),
        payload,
        timestamp,
        provenance: EventProvenance {
            block_number: timestamp as u64,
            tx_hash: B256::repeat_byte(0xaa),
            tx_index: 0,
            block_hash: B256::repeat_byte(0xbb),
            log_index,
        },
    }
}

fn application(timestamp: i64, log_index: u64) -> Event {
    event(
        ContractKind::Registry,
        "_Application",
        LISTING,
        timestamp,
        log_index,
        EventPayload::new()
            .with("listingAddress", PayloadValue::Address(LISTING))
            .with("applicant", PayloadValue::Address(APPLICANT))
            .with("deposit", PayloadValue::Uint(U256::from(1_000u64)))
            .with("appEndDate", PayloadValue::Uint(U256::from(9_999u64))),
    )
}

fn new_challenge(challenge_id: u64, timestamp: i64, log_index: u64) -> Event {
    event(
        ContractKind::Registry,
        "_NewChallenge",
        LISTING,
        timestamp,
        log_index,
        EventPayload::new()
            .with("listingAddress", PayloadValue::Address(LISTING))
            .with("challengeID", PayloadValue::Uint(U256::from(challenge_id)))
            .with("challenger", PayloadValue::Address(CHALLENGER))
            .with("commitEndDate", PayloadValue::Uint(U256::from(2_000u64)))
            .with("revealEndDate", PayloadValue::Uint(U256::from(3_000u64)))
            .with("voteQuorum", PayloadValue::Uint(U256::from(50u64))),
    )
}

fn transfer(from: Address, to: Address, amount: u64, timestamp: i64, log_index: u64) -> Event {
    event(
        ContractKind::Token,
        "Transfer",
        Address::repeat_byte(0x99),
        timestamp,
        log_index,
        EventPayload::new()
            .with("from", PayloadValue::Address(from))
            .with("to", PayloadValue::Address(to))
            .with("value", PayloadValue::Uint(U256::from(amount))),
    )
}

#[tokio::test]
async fn failed_challenge_whitelists_the_listing() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let batch = vec![
        application(1_000, 0),
        new_challenge(3, 1_010, 1),
        event(
            ContractKind::Registry,
            "_ChallengeFailed",
            LISTING,
            1_020,
            2,
            EventPayload::new()
                .with("challengeID", PayloadValue::Uint(U256::from(3u64)))
                .with("rewardPool", PayloadValue::Uint(U256::from(700u64)))
                .with("totalTokens", PayloadValue::Uint(U256::from(90u64))),
        ),
    ];
    let summary = engine.process(&batch).await.unwrap();
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.unclaimed, 0);

    let listing = store.listing_by_address(LISTING).await.unwrap();
    assert!(listing.whitelisted);
    assert_eq!(listing.state, GovernanceState::AppWhitelisted);
    assert_eq!(listing.challenge_id, None);
    assert_eq!(listing.last_updated, 1_020);

    let challenge = store.challenge_by_id(3).await.unwrap();
    assert!(challenge.resolved);
    assert_eq!(challenge.reward_pool, U256::from(700u64));
    assert_eq!(challenge.total_tokens, U256::from(90u64));
    assert_eq!(challenge.challenger, CHALLENGER);

    // The challenge poll shares the challenge id.
    let poll = store.poll_by_id(3).await.unwrap();
    assert_eq!(poll.commit_end, 2_000);

    // Every claimed registry event leaves an audit record.
    let audit = store
        .events_by_criteria(&Default::default())
        .await
        .unwrap();
    assert_eq!(audit.len(), 3);
    assert!(audit.iter().any(|e| e.event_type == "NewChallenge"));
    assert!(audit.iter().all(|e| e.listing_address == LISTING));
}

#[tokio::test]
async fn successful_challenge_removes_the_listing() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let batch = vec![
        application(1_000, 0),
        new_challenge(7, 1_010, 1),
        event(
            ContractKind::Registry,
            "_ChallengeSucceeded",
            LISTING,
            1_020,
            2,
            EventPayload::new().with("challengeID", PayloadValue::Uint(U256::from(7u64))),
        ),
    ];
    engine.process(&batch).await.unwrap();

    let listing = store.listing_by_address(LISTING).await.unwrap();
    assert!(!listing.whitelisted);
    assert_eq!(listing.state, GovernanceState::Removed);
    assert_eq!(listing.challenge_id, None);
    assert!(store.challenge_by_id(7).await.unwrap().resolved);
}

#[tokio::test]
async fn resolved_challenge_ignores_replayed_outcomes() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    engine
        .process(&[application(1_000, 0), new_challenge(5, 1_010, 1)])
        .await
        .unwrap();

    let failed = event(
        ContractKind::Registry,
        "_ChallengeFailed",
        LISTING,
        1_020,
        2,
        EventPayload::new().with("challengeID", PayloadValue::Uint(U256::from(5u64))),
    );
    let succeeded = event(
        ContractKind::Registry,
        "_ChallengeSucceeded",
        LISTING,
        1_030,
        3,
        EventPayload::new().with("challengeID", PayloadValue::Uint(U256::from(5u64))),
    );
    engine.process(&[failed, succeeded]).await.unwrap();

    // The second outcome hit the resolved guard; the first verdict stands.
    let listing = store.listing_by_address(LISTING).await.unwrap();
    assert!(listing.whitelisted);
    assert_eq!(listing.state, GovernanceState::AppWhitelisted);
}

#[tokio::test]
async fn vote_reveals_accumulate_tallies() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let reveal = |tokens: u64, choice: u64, log_index: u64| {
        event(
            ContractKind::Voting,
            "_VoteRevealed",
            Address::repeat_byte(0x55),
            1_010,
            log_index,
            EventPayload::new()
                .with("pollID", PayloadValue::Uint(U256::from(9u64)))
                .with("numTokens", PayloadValue::Uint(U256::from(tokens)))
                .with("choice", PayloadValue::Uint(U256::from(choice))),
        )
    };
    let batch = vec![
        event(
            ContractKind::Voting,
            "_PollCreated",
            Address::repeat_byte(0x55),
            1_000,
            0,
            EventPayload::new()
                .with("pollID", PayloadValue::Uint(U256::from(9u64)))
                .with("commitEndDate", PayloadValue::Uint(U256::from(2_000u64)))
                .with("revealEndDate", PayloadValue::Uint(U256::from(3_000u64)))
                .with("voteQuorum", PayloadValue::Uint(U256::from(50u64))),
        ),
        reveal(30, 1, 1),
        reveal(12, 1, 2),
        reveal(5, 0, 3),
    ];
    engine.process(&batch).await.unwrap();

    let poll = store.poll_by_id(9).await.unwrap();
    assert_eq!(poll.votes_for, U256::from(42u64));
    assert_eq!(poll.votes_against, U256::from(5u64));
    assert!(poll.passed());
}

#[tokio::test]
async fn vote_commits_are_claimed_without_moving_tallies() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let batch = vec![
        event(
            ContractKind::Voting,
            "_PollCreated",
            Address::repeat_byte(0x55),
            1_000,
            0,
            EventPayload::new()
                .with("pollID", PayloadValue::Uint(U256::from(9u64)))
                .with("commitEndDate", PayloadValue::Uint(U256::from(2_000u64)))
                .with("revealEndDate", PayloadValue::Uint(U256::from(3_000u64)))
                .with("voteQuorum", PayloadValue::Uint(U256::from(50u64))),
        ),
        event(
            ContractKind::Voting,
            "_VoteCommitted",
            Address::repeat_byte(0x55),
            1_005,
            1,
            EventPayload::new()
                .with("pollID", PayloadValue::Uint(U256::from(9u64)))
                .with("numTokens", PayloadValue::Uint(U256::from(30u64))),
        ),
    ];
    let summary = engine.process(&batch).await.unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.unclaimed, 0);

    // Tallies only move on reveal.
    let poll = store.poll_by_id(9).await.unwrap();
    assert_eq!(poll.votes_for, U256::ZERO);
    assert_eq!(poll.votes_against, U256::ZERO);
}

#[tokio::test]
async fn duplicate_transfer_is_recorded_once() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    // Same accounts, amount and date on two distinct logs.
    let batch = vec![
        transfer(APPLICANT, CHALLENGER, 250, 1_000, 0),
        transfer(APPLICANT, CHALLENGER, 250, 1_000, 1),
    ];
    let summary = engine.process(&batch).await.unwrap();
    assert_eq!(summary.processed, 2);

    let purchases = store.purchases_by_purchaser(CHALLENGER).await.unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].amount, U256::from(250u64));

    let transfers = store
        .transfers_by_criteria(&Default::default())
        .await
        .unwrap();
    assert_eq!(transfers.len(), 1);
}

#[tokio::test]
async fn distinct_transfers_are_all_recorded() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let batch = vec![
        transfer(APPLICANT, CHALLENGER, 250, 1_000, 0),
        transfer(APPLICANT, CHALLENGER, 251, 1_000, 1),
        transfer(APPLICANT, CHALLENGER, 250, 1_001, 2),
    ];
    engine.process(&batch).await.unwrap();

    let purchases = store.purchases_by_purchaser(CHALLENGER).await.unwrap();
    assert_eq!(purchases.len(), 3);
}

#[tokio::test]
async fn accepted_proposal_reaches_terminal_state() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let prop_id = B256::repeat_byte(0x77);
    let parameterizer = Address::repeat_byte(0x66);
    let batch = vec![
        event(
            ContractKind::Parameterizer,
            "_ReparameterizationProposal",
            parameterizer,
            1_000,
            0,
            EventPayload::new()
                .with("propID", PayloadValue::Bytes32(prop_id))
                .with("name", PayloadValue::Str("minDeposit".to_string()))
                .with("value", PayloadValue::Uint(U256::from(5_000u64)))
                .with("proposer", PayloadValue::Address(APPLICANT))
                .with("deposit", PayloadValue::Uint(U256::from(100u64)))
                .with("appEndDate", PayloadValue::Uint(U256::from(9_000u64))),
        ),
        event(
            ContractKind::Parameterizer,
            "_ProposalAccepted",
            parameterizer,
            1_010,
            1,
            EventPayload::new().with("propID", PayloadValue::Bytes32(prop_id)),
        ),
    ];
    engine.process(&batch).await.unwrap();

    let proposal = store.proposal_by_id(prop_id).await.unwrap();
    assert!(proposal.accepted);
    assert!(!proposal.expired);
    assert_eq!(proposal.name, "minDeposit");
    assert_eq!(proposal.value, U256::from(5_000u64));
}

#[tokio::test]
async fn government_proposals_project_separately() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let prop_id = B256::repeat_byte(0x78);
    let batch = vec![event(
        ContractKind::Government,
        "_ReparameterizationProposal",
        Address::repeat_byte(0x67),
        1_000,
        0,
        EventPayload::new()
            .with("propID", PayloadValue::Bytes32(prop_id))
            .with("name", PayloadValue::Str("judgeAppealLen".to_string()))
            .with("value", PayloadValue::Uint(U256::from(3_600u64)))
            .with("proposer", PayloadValue::Address(APPLICANT)),
    )];
    engine.process(&batch).await.unwrap();

    assert!(store.govt_proposal_by_id(prop_id).await.is_ok());
    assert!(optional(store.proposal_by_id(prop_id).await)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn malformed_event_fails_without_halting_the_batch() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    // First event is missing its applicant; the remaining nine are valid.
    let mut batch = vec![event(
        ContractKind::Registry,
        "_Application",
        LISTING,
        1_000,
        0,
        EventPayload::new().with("listingAddress", PayloadValue::Address(LISTING)),
    )];
    for i in 0..9u64 {
        batch.push(transfer(APPLICANT, CHALLENGER, 100 + i, 1_000 + i as i64, 1 + i));
    }

    let err = engine.process(&batch).await.unwrap_err();
    match err {
        EngineError::Event { index, name, .. } => {
            assert_eq!(index, 0);
            assert_eq!(name, "_Application");
        }
        other => panic!("unexpected engine error: {other}"),
    }

    // The failure did not stop the rest of the batch.
    let transfers = store
        .transfers_by_criteria(&Default::default())
        .await
        .unwrap();
    assert_eq!(transfers.len(), 9);
    assert!(optional(store.listing_by_address(LISTING).await)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn duplicate_route_claims_are_rejected_at_construction() {
    let store = Arc::new(MemoryStore::new());
    let handlers: Vec<Arc<dyn EventHandler>> = vec![
        Arc::new(TokenProcessor::new(store.clone())),
        Arc::new(TokenProcessor::new(store.clone())),
    ];
    let Err(err) = Engine::new(
        handlers,
        Arc::new(NoopPublisher),
        Arc::new(Mutex::new(())),
    ) else {
        panic!("duplicate route was accepted");
    };
    match err {
        EngineError::DuplicateRoute { kind, name } => {
            assert_eq!(kind, ContractKind::Token);
            assert_eq!(name, "Transfer");
        }
        other => panic!("unexpected engine error: {other}"),
    }
}

#[tokio::test]
async fn unclaimed_events_leave_no_trace() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    // A transfer-shaped event from the wrong contract family has no route.
    let batch = vec![event(
        ContractKind::Registry,
        "Transfer",
        LISTING,
        1_000,
        0,
        EventPayload::new()
            .with("from", PayloadValue::Address(APPLICANT))
            .with("to", PayloadValue::Address(CHALLENGER))
            .with("value", PayloadValue::Uint(U256::from(1u64))),
    )];
    let summary = engine.process(&batch).await.unwrap();
    assert_eq!(summary.processed, 0);
    assert_eq!(summary.unclaimed, 1);

    assert!(optional(store.transfers_by_criteria(&Default::default()).await)
        .unwrap()
        .is_none());
    assert!(optional(store.events_by_criteria(&Default::default()).await)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn multisig_ownership_changes_project_membership() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let owner_a = Address::repeat_byte(0x01);
    let owner_b = Address::repeat_byte(0x02);
    let owner_event = |name: &str, owner: Address, log_index: u64| {
        event(
            ContractKind::MultiSig,
            name,
            WALLET,
            1_000 + log_index as i64,
            log_index,
            EventPayload::new().with("owner", PayloadValue::Address(owner)),
        )
    };
    let batch = vec![
        owner_event("OwnerAddition", owner_a, 0),
        owner_event("OwnerAddition", owner_b, 1),
        owner_event("OwnerRemoval", owner_a, 2),
    ];
    engine.process(&batch).await.unwrap();

    assert!(store.multi_sig_by_address(WALLET).await.is_ok());
    let owners = store.owners(WALLET).await.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].owner_address, owner_b);
}

#[tokio::test]
async fn content_revision_replay_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let engine = engine_over(&store);

    let publish = |timestamp: i64, log_index: u64| {
        event(
            ContractKind::ContentRegistry,
            "ContentPublished",
            LISTING,
            timestamp,
            log_index,
            EventPayload::new()
                .with("contentId", PayloadValue::Uint(U256::from(4u64)))
                .with("revisionId", PayloadValue::Uint(U256::from(1u64)))
                .with("uri", PayloadValue::Str("ipfs://rev".to_string()))
                .with("editor", PayloadValue::Address(APPLICANT)),
        )
    };
    engine
        .process(&[publish(1_000, 0), publish(1_500, 1)])
        .await
        .unwrap();

    let revisions = store.revisions_by_listing(LISTING).await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].revision_date, 1_000);
    assert_eq!(
        revisions[0].payload_hash,
        alloy_primitives::keccak256("ipfs://rev".as_bytes())
    );
}

#[tokio::test]
async fn cursor_round_trips_the_watermark() {
    let store = Arc::new(MemoryStore::new());

    assert!(optional(store.watermark().await).unwrap().is_none());

    let watermark = Watermark::genesis().advanced(&[transfer(APPLICANT, CHALLENGER, 1, 500, 0)]);
    store.save_watermark(&watermark).await.unwrap();
    assert_eq!(store.watermark().await.unwrap(), watermark);
}
