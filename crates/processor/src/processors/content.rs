//! Content-registry sub-processor.
//!
//! Revision-published events project into [`ContentRevision`] records
//! keyed by `(listing, content id, revision id)`. The revision payload is
//! hashed through the injected hasher before persistence; scraper
//! enrichment is best-effort and degrades to an unenriched record.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{claims, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{optional, ContentRevisionStore};
use crate::scraper::{ContentHasher, ContentScraper};
use tcr_core::{ContentRevision, ContractKind};

const CONTENT_EVENTS: &[&str] = &["ContentPublished", "RevisionUpdated"];

const KINDS: &[ContractKind] = &[ContractKind::ContentRegistry];

/// Sub-processor for per-listing content registries.
pub struct ContentProcessor {
    revisions: Arc<dyn ContentRevisionStore>,
    hasher: Arc<dyn ContentHasher>,
    scraper: Option<Arc<dyn ContentScraper>>,
}

impl ContentProcessor {
    /// Create a content processor. Pass `None` for the scraper to disable
    /// off-chain enrichment.
    pub fn new(
        revisions: Arc<dyn ContentRevisionStore>,
        hasher: Arc<dyn ContentHasher>,
        scraper: Option<Arc<dyn ContentScraper>>,
    ) -> Self {
        Self {
            revisions,
            hasher,
            scraper,
        }
    }

    async fn apply_revision(&self, event: &Event) -> Result<(), ProcessorError> {
        // The emitting content registry contract is the listing.
        let listing_address = event.contract_address;
        let content_id = event.payload.uint64("contentId")?;
        let revision_id = event.payload.uint64("revisionId")?;
        let uri = event.payload.str_("uri")?.to_string();
        let editor = event.payload.address("editor")?;

        if optional(
            self.revisions
                .revision(listing_address, content_id, revision_id)
                .await,
        )?
        .is_some()
        {
            debug!(
                listing = %listing_address,
                content_id,
                revision_id,
                "revision replay, record already exists"
            );
            return Ok(());
        }

        let mut author = None;
        let mut body = None;
        if let Some(scraper) = &self.scraper {
            match scraper.scrape_content(&uri).await {
                Ok(content) => body = Some(content.body),
                Err(err) => warn!(%err, "content scrape failed, storing unenriched revision"),
            }
            match scraper.scrape_metadata(&uri).await {
                Ok(metadata) => author = metadata.author,
                Err(err) => warn!(%err, "metadata scrape failed"),
            }
        }

        // Hash whatever payload we hold for the revision: the scraped body
        // when enrichment succeeded, otherwise the published URI.
        let payload_hash = match &body {
            Some(body) => self.hasher.hash(body.as_bytes()),
            None => self.hasher.hash(uri.as_bytes()),
        };

        let revision = ContentRevision {
            listing_address,
            content_id,
            revision_id,
            revision_uri: uri,
            payload_hash,
            editor,
            author,
            body,
            revision_date: event.timestamp,
        };
        self.revisions.create_revision(&revision).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ContentProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        CONTENT_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }
        self.apply_revision(event).await?;
        Ok(true)
    }
}
