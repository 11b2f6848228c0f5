//! JSON file event source.
//!
//! Reads a decoded-event batch from a JSON file on every poll. Combined
//! with the watermark filter this makes repeated polls of the same file
//! idempotent, which is what the cron deployment mode relies on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use tcr_processor::watermark::{EventSource, Watermark};
use tcr_processor::Event;

/// Event source backed by a JSON file holding an ordered event array.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading from the given file.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl EventSource for JsonFileSource {
    async fn fetch_since(&self, _watermark: &Watermark) -> Result<Vec<Event>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read event file {}", self.path.display()))?;
        let events: Vec<Event> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse event file {}", self.path.display()))?;
        Ok(events)
    }
}
