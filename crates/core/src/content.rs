//! Content registry revision records.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// A published content revision on a listing's content registry.
///
/// Keyed by `(listing_address, content_id, revision_id)`. The payload hash
/// is computed by an injected hasher before persistence; author and body
/// are optional enrichment from the off-chain scrapers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRevision {
    /// Listing (content registry contract) the revision belongs to.
    pub listing_address: Address,

    /// Content item identifier within the registry.
    pub content_id: u64,

    /// Revision identifier within the content item.
    pub revision_id: u64,

    /// URI the revision payload was published at.
    pub revision_uri: String,

    /// Hash of the revision payload.
    pub payload_hash: B256,

    /// Account that published the revision.
    pub editor: Address,

    /// Scraped author name, when enrichment succeeded.
    pub author: Option<String>,

    /// Scraped body text, when enrichment succeeded.
    pub body: Option<String>,

    /// Unix timestamp of the publishing event.
    pub revision_date: i64,
}
