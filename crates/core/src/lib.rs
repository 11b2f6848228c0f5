//! # TCR Core
//!
//! Entity model for the token-curated registry event indexer.
//!
//! This crate defines the aggregate records projected out of the on-chain
//! event stream (listings, challenges, polls, appeals, parameter proposals,
//! token movements, multisig wallets, content revisions and governance audit
//! records) together with their enumerated governance states, the criteria
//! structs used for retrieval, and the patch objects used for field-level
//! partial updates.
//!
//! Entities here are plain data: they perform no I/O and are mutated only by
//! applying an explicit patch produced by a domain sub-processor.

#![warn(missing_docs)]

pub mod audit;
pub mod challenge;
pub mod content;
pub mod criteria;
pub mod error;
pub mod listing;
pub mod multisig;
pub mod proposal;
pub mod provenance;
pub mod state;
pub mod token;

pub use audit::{GovernanceEvent, GovernanceEventPatch};
pub use challenge::{Appeal, AppealPatch, Challenge, ChallengePatch, Poll, PollPatch};
pub use content::ContentRevision;
pub use criteria::{
    ChallengeCriteria, GovernanceEventCriteria, ListingCriteria, TokenPurchaseCriteria,
    TokenTransferCriteria,
};
pub use error::CoreError;
pub use listing::{Listing, ListingPatch};
pub use multisig::{MultiSig, MultiSigOwner};
pub use proposal::{GovtParamProposal, ParamProposal, ParamProposalPatch};
pub use provenance::EventProvenance;
pub use state::{ContractKind, GovernanceState};
pub use token::{TokenPurchase, TokenTransfer, TOKEN_BASE_UNITS};

// Re-export Alloy primitives for convenience
pub use alloy_primitives::{Address, B256, U256};
