//! Token sub-processor.
//!
//! Transfer events append purchase and transfer records. Duplicate
//! suppression is genuine value equality over (account pair, amount,
//! date): reprocessing the same transfer log twice persists exactly one
//! purchase.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{claims, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{optional, TokenStore};
use tcr_core::{ContractKind, TokenPurchase, TokenTransfer};

const TOKEN_EVENTS: &[&str] = &["Transfer"];

const KINDS: &[ContractKind] = &[ContractKind::Token];

/// Sub-processor for the token contract family.
pub struct TokenProcessor {
    tokens: Arc<dyn TokenStore>,
}

impl TokenProcessor {
    /// Create a token processor over the token store.
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }

    async fn apply_transfer(&self, event: &Event) -> Result<(), ProcessorError> {
        let to = event.payload.address("to")?;
        let from = event.payload.address("from")?;
        let amount = event.payload.uint("value")?;

        let candidate = TokenPurchase {
            purchaser: to,
            source: from,
            amount,
            purchase_date: event.timestamp,
            provenance: event.provenance,
        };

        let existing = optional(self.tokens.purchases_by_purchaser(to).await)?.unwrap_or_default();
        if existing.iter().any(|p| p.same_purchase(&candidate)) {
            info!(
                purchaser = %to,
                amount = %amount,
                "duplicate transfer, purchase already recorded"
            );
            return Ok(());
        }

        self.tokens.create_purchase(&candidate).await?;
        self.tokens
            .create_transfer(&TokenTransfer {
                to_address: to,
                from_address: from,
                amount,
                transfer_date: event.timestamp,
                provenance: event.provenance,
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for TokenProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        TOKEN_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }
        self.apply_transfer(event).await?;
        Ok(true)
    }
}
