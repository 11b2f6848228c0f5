//! Retrieval criteria for the persistence ports.
//!
//! Every field is an optional filter; unset fields do not constrain the
//! result set. `offset`/`count` paginate; a `count` of zero means no limit.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// Filters for listing retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingCriteria {
    /// Only whitelisted listings.
    pub whitelisted_only: bool,

    /// Only listings with an open challenge.
    pub active_challenge: bool,

    /// Only listings applied at or after this unix timestamp.
    pub created_from: Option<i64>,

    /// Only listings applied before this unix timestamp.
    pub created_before: Option<i64>,

    /// Pagination offset.
    pub offset: u32,

    /// Page size; zero means unlimited.
    pub count: u32,
}

/// Filters for challenge retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCriteria {
    /// Only challenges against this listing.
    pub listing_address: Option<Address>,

    /// Filter by resolution state.
    pub resolved: Option<bool>,

    /// Pagination offset.
    pub offset: u32,

    /// Page size; zero means unlimited.
    pub count: u32,
}

/// Filters for governance audit record retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceEventCriteria {
    /// Only records for this listing.
    pub listing_address: Option<Address>,

    /// Only records created at or after this unix timestamp.
    pub created_from: Option<i64>,

    /// Only records created before this unix timestamp.
    pub created_before: Option<i64>,

    /// Only records with this event-type label.
    pub event_type: Option<String>,

    /// Pagination offset.
    pub offset: u32,

    /// Page size; zero means unlimited.
    pub count: u32,
}

/// Filters for token purchase retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPurchaseCriteria {
    /// Only purchases by this account.
    pub purchaser: Option<Address>,

    /// Only purchases at or after this unix timestamp.
    pub created_from: Option<i64>,

    /// Only purchases before this unix timestamp.
    pub created_before: Option<i64>,

    /// Pagination offset.
    pub offset: u32,

    /// Page size; zero means unlimited.
    pub count: u32,
}

/// Filters for token transfer retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferCriteria {
    /// Only transfers into this account.
    pub to_address: Option<Address>,

    /// Only transfers out of this account.
    pub from_address: Option<Address>,

    /// Pagination offset.
    pub offset: u32,

    /// Page size; zero means unlimited.
    pub count: u32,
}
