//! Administrative multisig wallet records.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

/// An administrative multi-signature wallet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSig {
    /// Wallet contract address.
    pub address: Address,

    /// Unix timestamp of first observation.
    pub created: i64,

    /// Unix timestamp of the last ownership change.
    pub last_updated: i64,
}

/// Membership of an owner account in a multisig wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiSigOwner {
    /// Wallet the owner belongs to.
    pub multi_sig_address: Address,

    /// Owner account address.
    pub owner_address: Address,

    /// Unix timestamp the owner was added.
    pub added: i64,
}
