//! Block provenance attached to projected records.

use alloy_primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};

/// Block coordinates of the log an event was decoded from.
///
/// Carried on every append-only record so aggregate state can always be
/// traced back to the emitting transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventProvenance {
    /// Block number where the event occurred.
    pub block_number: u64,

    /// Transaction hash.
    pub tx_hash: B256,

    /// Transaction index within the block.
    pub tx_index: u64,

    /// Hash of the containing block.
    pub block_hash: B256,

    /// Log index within the block.
    pub log_index: u64,
}

impl EventProvenance {
    /// Stable identity hash for the source log.
    ///
    /// `keccak256(tx_hash || log_index)`: unique per emitted log and stable
    /// across replays, which is what the watermark's same-timestamp
    /// deduplication set keys on.
    pub fn event_hash(&self) -> B256 {
        let mut buf = [0u8; 40];
        buf[..32].copy_from_slice(self.tx_hash.as_slice());
        buf[32..].copy_from_slice(&self.log_index.to_be_bytes());
        keccak256(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_hash_distinguishes_log_index() {
        let a = EventProvenance {
            block_number: 10,
            tx_hash: B256::repeat_byte(0xaa),
            tx_index: 0,
            block_hash: B256::repeat_byte(0x01),
            log_index: 0,
        };
        let mut b = a;
        b.log_index = 1;

        assert_ne!(a.event_hash(), b.event_hash());
        assert_eq!(a.event_hash(), a.event_hash());
    }
}
