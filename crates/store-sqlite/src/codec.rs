//! Column codecs shared by the store modules.
//!
//! Addresses and 32-byte hashes travel as BLOBs, 256-bit amounts as
//! decimal TEXT, address lists and metadata maps as JSON TEXT.

use alloy_primitives::{Address, B256, U256};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use tcr_core::EventProvenance;
use tcr_processor::StoreError;

/// Wrap a backend failure in the port error type.
pub(crate) fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

pub(crate) fn blob_to_address(bytes: &[u8]) -> Result<Address, StoreError> {
    if bytes.len() != Address::len_bytes() {
        return Err(backend(format!(
            "invalid address blob length {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(bytes))
}

pub(crate) fn blob_to_b256(bytes: &[u8]) -> Result<B256, StoreError> {
    if bytes.len() != B256::len_bytes() {
        return Err(backend(format!("invalid hash blob length {}", bytes.len())));
    }
    Ok(B256::from_slice(bytes))
}

pub(crate) fn text_to_u256(text: &str) -> Result<U256, StoreError> {
    text.parse::<U256>()
        .map_err(|err| backend(format!("invalid amount text {text:?}: {err}")))
}

pub(crate) fn addresses_to_json(addresses: &[Address]) -> Result<String, StoreError> {
    serde_json::to_string(addresses).map_err(backend)
}

pub(crate) fn json_to_addresses(text: &str) -> Result<Vec<Address>, StoreError> {
    serde_json::from_str(text).map_err(backend)
}

/// Decode the five provenance columns carried by append-only tables.
pub(crate) fn row_to_provenance(row: &SqliteRow) -> Result<EventProvenance, StoreError> {
    let block_number: i64 = row.get("block_number");
    let tx_hash: Vec<u8> = row.get("tx_hash");
    let tx_index: i64 = row.get("tx_index");
    let block_hash: Vec<u8> = row.get("block_hash");
    let log_index: i64 = row.get("log_index");

    Ok(EventProvenance {
        block_number: block_number as u64,
        tx_hash: blob_to_b256(&tx_hash)?,
        tx_index: tx_index as u64,
        block_hash: blob_to_b256(&block_hash)?,
        log_index: log_index as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_text_round_trips() {
        let amount = U256::from(123_456_789u64);
        assert_eq!(text_to_u256(&amount.to_string()).unwrap(), amount);
        assert!(text_to_u256("not a number").is_err());
    }

    #[test]
    fn address_list_json_round_trips() {
        let addresses = vec![Address::repeat_byte(0x11), Address::repeat_byte(0x22)];
        let json = addresses_to_json(&addresses).unwrap();
        assert_eq!(json_to_addresses(&json).unwrap(), addresses);
        assert_eq!(json_to_addresses("[]").unwrap(), Vec::<Address>::new());
    }

    #[test]
    fn blob_decoding_rejects_bad_lengths() {
        assert!(blob_to_address(&[0u8; 20]).is_ok());
        assert!(blob_to_address(&[0u8; 19]).is_err());
        assert!(blob_to_b256(&[0u8; 32]).is_ok());
        assert!(blob_to_b256(&[0u8; 31]).is_err());
    }
}
