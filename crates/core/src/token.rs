//! Token movement records.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::provenance::EventProvenance;

/// Divisor converting base-unit amounts to whole tokens (18 decimals).
pub const TOKEN_BASE_UNITS: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);

/// An append-only record of tokens acquired by an account.
///
/// Value equality for duplicate suppression is defined over the account
/// pair, the amount and the purchase date, never over transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPurchase {
    /// Account that received the tokens.
    pub purchaser: Address,

    /// Account the tokens came from.
    pub source: Address,

    /// Amount in base units.
    pub amount: U256,

    /// Unix timestamp of the purchase.
    pub purchase_date: i64,

    /// Block coordinates of the emitting transfer log.
    pub provenance: EventProvenance,
}

impl TokenPurchase {
    /// Value equality used for idempotent duplicate detection.
    pub fn same_purchase(&self, other: &TokenPurchase) -> bool {
        self.purchaser == other.purchaser
            && self.source == other.source
            && self.amount == other.amount
            && self.purchase_date == other.purchase_date
    }

    /// Amount in whole tokens, truncating the fractional part.
    pub fn whole_tokens(&self) -> U256 {
        self.amount / TOKEN_BASE_UNITS
    }
}

/// An append-only record of a raw token transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Destination account.
    pub to_address: Address,

    /// Source account.
    pub from_address: Address,

    /// Amount in base units.
    pub amount: U256,

    /// Unix timestamp of the transfer.
    pub transfer_date: i64,

    /// Block coordinates of the emitting transfer log.
    pub provenance: EventProvenance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn provenance(log_index: u64) -> EventProvenance {
        EventProvenance {
            block_number: 100,
            tx_hash: B256::repeat_byte(0xaa),
            tx_index: 1,
            block_hash: B256::repeat_byte(0x01),
            log_index,
        }
    }

    #[test]
    fn same_purchase_ignores_provenance() {
        let a = TokenPurchase {
            purchaser: Address::repeat_byte(0x11),
            source: Address::repeat_byte(0x22),
            amount: U256::from(1_000),
            purchase_date: 1_234,
            provenance: provenance(0),
        };
        // Same content observed in a replayed log at a different index.
        let mut b = a.clone();
        b.provenance = provenance(5);
        assert!(a.same_purchase(&b));

        let mut c = a.clone();
        c.amount = U256::from(1_001);
        assert!(!a.same_purchase(&c));
    }

    #[test]
    fn whole_tokens_divides_by_base_units() {
        let purchase = TokenPurchase {
            purchaser: Address::repeat_byte(0x11),
            source: Address::repeat_byte(0x22),
            amount: U256::from(3) * TOKEN_BASE_UNITS + U256::from(7),
            purchase_date: 0,
            provenance: provenance(0),
        };
        assert_eq!(purchase.whole_tokens(), U256::from(3));
    }
}
