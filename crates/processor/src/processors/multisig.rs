//! Multisig sub-processor.
//!
//! Ownership-changed events maintain wallet and owner membership records
//! and publish an administrative notification. Publishing is best-effort.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{claims, EventHandler};
use crate::error::ProcessorError;
use crate::event::Event;
use crate::persistence::{optional, MultiSigStore};
use crate::publisher::{OwnerAction, PubMessage, Publisher};
use tcr_core::{ContractKind, MultiSig, MultiSigOwner};

const MULTI_SIG_EVENTS: &[&str] = &["OwnerAddition", "OwnerRemoval"];

const KINDS: &[ContractKind] = &[ContractKind::MultiSig];

/// Sub-processor for administrative multisig wallets.
pub struct MultiSigProcessor {
    multi_sigs: Arc<dyn MultiSigStore>,
    publisher: Arc<dyn Publisher>,
}

impl MultiSigProcessor {
    /// Create a multisig processor over the given store and publisher.
    pub fn new(multi_sigs: Arc<dyn MultiSigStore>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            multi_sigs,
            publisher,
        }
    }

    async fn ensure_wallet(&self, event: &Event) -> Result<(), ProcessorError> {
        let address = event.contract_address;
        if optional(self.multi_sigs.multi_sig_by_address(address).await)?.is_none() {
            self.multi_sigs
                .create_multi_sig(&MultiSig {
                    address,
                    created: event.timestamp,
                    last_updated: event.timestamp,
                })
                .await?;
        }
        Ok(())
    }

    async fn apply_ownership_change(
        &self,
        event: &Event,
        action: OwnerAction,
    ) -> Result<(), ProcessorError> {
        let multi_sig_address = event.contract_address;
        let owner_address = event.payload.address("owner")?;

        self.ensure_wallet(event).await?;
        match action {
            OwnerAction::Added => {
                self.multi_sigs
                    .add_owner(&MultiSigOwner {
                        multi_sig_address,
                        owner_address,
                        added: event.timestamp,
                    })
                    .await?;
            }
            OwnerAction::Removed => {
                self.multi_sigs
                    .remove_owner(multi_sig_address, owner_address)
                    .await?;
            }
        }
        debug!(
            wallet = %multi_sig_address,
            owner = %owner_address,
            action = action.as_str(),
            "multisig ownership changed"
        );

        let message = PubMessage::MultiSigAction {
            action,
            owner_addr: owner_address,
            multi_sig_addr: multi_sig_address,
        };
        if let Err(err) = self.publisher.publish(&message).await {
            warn!(%err, "multisig notification publish failed");
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for MultiSigProcessor {
    fn contract_kinds(&self) -> &'static [ContractKind] {
        KINDS
    }

    fn event_names(&self) -> &'static [&'static str] {
        MULTI_SIG_EVENTS
    }

    async fn process(&self, event: &Event) -> Result<bool, ProcessorError> {
        if !claims(self, event) {
            return Ok(false);
        }
        let action = match event.base_name() {
            "OwnerAddition" => OwnerAction::Added,
            _ => OwnerAction::Removed,
        };
        self.apply_ownership_change(event, action).await?;
        Ok(true)
    }
}
