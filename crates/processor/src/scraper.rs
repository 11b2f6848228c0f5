//! Content scraper and hasher collaborators for the content registry.

use alloy_primitives::{keccak256, B256};
use async_trait::async_trait;
use thiserror::Error;

/// Error raised by a scraper implementation.
#[derive(Error, Debug)]
#[error("scrape failure for {uri}: {reason}")]
pub struct ScrapeError {
    /// URI that failed to scrape.
    pub uri: String,
    /// Failure description.
    pub reason: String,
}

/// Scraped article content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedContent {
    /// Raw body text.
    pub body: String,
}

/// Scraped article metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapedMetadata {
    /// Article title.
    pub title: Option<String>,

    /// Author name.
    pub author: Option<String>,

    /// Short description.
    pub description: Option<String>,
}

/// Off-chain content scraper port.
#[async_trait]
pub trait ContentScraper: Send + Sync {
    /// Fetch the content payload behind a revision URI.
    async fn scrape_content(&self, uri: &str) -> Result<ScrapedContent, ScrapeError>;

    /// Fetch structured metadata for a revision URI.
    async fn scrape_metadata(&self, uri: &str) -> Result<ScrapedMetadata, ScrapeError>;
}

/// Payload hash collaborator used before revision persistence.
pub trait ContentHasher: Send + Sync {
    /// Hash a revision payload.
    fn hash(&self, payload: &[u8]) -> B256;
}

/// Default keccak256 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl ContentHasher for Keccak256Hasher {
    fn hash(&self, payload: &[u8]) -> B256 {
        keccak256(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_hasher_is_deterministic() {
        let hasher = Keccak256Hasher;
        assert_eq!(hasher.hash(b"abc"), hasher.hash(b"abc"));
        assert_ne!(hasher.hash(b"abc"), hasher.hash(b"abd"));
    }
}
