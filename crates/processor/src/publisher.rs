//! Outbound publisher port.
//!
//! Registry-governance events and multisig ownership changes are fanned
//! out through this port. Publishing is best-effort: failures are logged
//! by the caller and never fail a batch. When no topic is configured the
//! engine is wired with [`NoopPublisher`].

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

/// Error raised by a publisher implementation.
#[derive(Error, Debug)]
#[error("publish failure: {0}")]
pub struct PublishError(pub String);

/// Direction of a multisig ownership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerAction {
    /// An owner was added to the wallet.
    Added,
    /// An owner was removed from the wallet.
    Removed,
}

impl OwnerAction {
    /// Wire string for the notification body.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerAction::Added => "added",
            OwnerAction::Removed => "removed",
        }
    }
}

/// A message published through the outbound port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PubMessage {
    /// A registry-governance event was processed.
    GovernanceTx {
        /// Hash of the emitting transaction.
        tx_hash: B256,
    },
    /// A multisig wallet's ownership changed.
    MultiSigAction {
        /// Change direction.
        action: OwnerAction,
        /// Owner account affected.
        owner_addr: Address,
        /// Wallet address.
        multi_sig_addr: Address,
    },
}

impl PubMessage {
    /// JSON body for the wire.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PubMessage::GovernanceTx { tx_hash } => json!({
                "txHash": format!("{tx_hash:#x}"),
            }),
            PubMessage::MultiSigAction {
                action,
                owner_addr,
                multi_sig_addr,
            } => json!({
                "action": action.as_str(),
                "ownerAddr": format!("{owner_addr:#x}"),
                "multiSigAddr": format!("{multi_sig_addr:#x}"),
            }),
        }
    }
}

/// Outbound publisher port.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a message. Callers treat failures as non-fatal.
    async fn publish(&self, message: &PubMessage) -> Result<(), PublishError>;
}

/// Disabled-mode publisher: drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl Publisher for NoopPublisher {
    async fn publish(&self, message: &PubMessage) -> Result<(), PublishError> {
        debug!(body = %message.to_json(), "publishing disabled, dropping message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn governance_body_shape() {
        let msg = PubMessage::GovernanceTx {
            tx_hash: B256::repeat_byte(0xab),
        };
        let body = msg.to_json();
        assert_eq!(
            body["txHash"],
            format!("0x{}", "ab".repeat(32)),
        );
    }

    #[test]
    fn multisig_body_shape() {
        let msg = PubMessage::MultiSigAction {
            action: OwnerAction::Added,
            owner_addr: Address::repeat_byte(0x01),
            multi_sig_addr: Address::repeat_byte(0x02),
        };
        let body = msg.to_json();
        assert_eq!(body["action"], "added");
        assert_eq!(body["ownerAddr"], format!("0x{}", "01".repeat(20)));
        assert_eq!(body["multiSigAddr"], format!("0x{}", "02".repeat(20)));
    }
}
