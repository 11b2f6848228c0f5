//! Event model and the typed payload boundary.
//!
//! Source events carry a loosely-typed key/value payload. All decoding
//! happens here, at the family boundary: sub-processors ask for fields by
//! name and type and get a [`ProcessorError`] for anything absent or
//! mistyped, so no untyped lookups leak into transition logic.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ProcessorError;
use tcr_core::{ContractKind, EventProvenance};

/// A single decoded contract log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Contract family that emitted the event.
    pub contract_kind: ContractKind,

    /// Address of the emitting contract.
    pub contract_address: Address,

    /// Raw event name as declared by the source. The source convention
    /// prefixes names with underscores (`_Application`).
    pub name: String,

    /// Loosely-typed event arguments.
    pub payload: EventPayload,

    /// Unix timestamp of the containing block.
    pub timestamp: i64,

    /// Block coordinates of the log.
    pub provenance: EventProvenance,
}

impl Event {
    /// Event name with the source's marker underscores trimmed.
    pub fn base_name(&self) -> &str {
        self.name.trim_start_matches('_')
    }

    /// Stable identity hash of the emitting log.
    pub fn event_hash(&self) -> B256 {
        self.provenance.event_hash()
    }
}

/// A single payload value.
///
/// One tagged variant per argument type the source contracts emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadValue {
    /// An account address.
    Address(Address),
    /// An unsigned 256-bit integer.
    Uint(U256),
    /// A signed 64-bit integer.
    Int(i64),
    /// A UTF-8 string.
    Str(String),
    /// A fixed 32-byte value.
    Bytes32(B256),
    /// Arbitrary bytes.
    Bytes(Vec<u8>),
    /// A boolean.
    Bool(bool),
    /// A list of account addresses.
    Addresses(Vec<Address>),
}

impl PayloadValue {
    /// Human-readable rendering, used for audit metadata.
    pub fn render(&self) -> String {
        match self {
            PayloadValue::Address(a) => format!("{a:#x}"),
            PayloadValue::Uint(u) => u.to_string(),
            PayloadValue::Int(i) => i.to_string(),
            PayloadValue::Str(s) => s.clone(),
            PayloadValue::Bytes32(b) => format!("{b:#x}"),
            PayloadValue::Bytes(b) => alloy_primitives::hex::encode_prefixed(b),
            PayloadValue::Bool(b) => b.to_string(),
            PayloadValue::Addresses(list) => list
                .iter()
                .map(|a| format!("{a:#x}"))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Loosely-typed event arguments with typed, fallible accessors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPayload(HashMap<String, PayloadValue>);

impl EventPayload {
    /// Empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion.
    pub fn with(mut self, name: &str, value: PayloadValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// Iterate over raw entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PayloadValue)> {
        self.0.iter()
    }

    fn get(&self, name: &'static str) -> Result<&PayloadValue, ProcessorError> {
        self.0
            .get(name)
            .ok_or(ProcessorError::MissingField { name })
    }

    /// Required address field.
    pub fn address(&self, name: &'static str) -> Result<Address, ProcessorError> {
        match self.get(name)? {
            PayloadValue::Address(a) => Ok(*a),
            _ => Err(ProcessorError::FieldType {
                name,
                expected: "address",
            }),
        }
    }

    /// Required unsigned integer field.
    pub fn uint(&self, name: &'static str) -> Result<U256, ProcessorError> {
        match self.get(name)? {
            PayloadValue::Uint(u) => Ok(*u),
            _ => Err(ProcessorError::FieldType {
                name,
                expected: "uint",
            }),
        }
    }

    /// Required unsigned integer field narrowed to `u64`.
    pub fn uint64(&self, name: &'static str) -> Result<u64, ProcessorError> {
        let value = self.uint(name)?;
        value.try_into().map_err(|_| ProcessorError::FieldType {
            name,
            expected: "uint64",
        })
    }

    /// Required unsigned integer field interpreted as a unix timestamp.
    pub fn timestamp(&self, name: &'static str) -> Result<i64, ProcessorError> {
        let value = self.uint64(name)?;
        i64::try_from(value).map_err(|_| ProcessorError::FieldType {
            name,
            expected: "timestamp",
        })
    }

    /// Required string field.
    pub fn str_(&self, name: &'static str) -> Result<&str, ProcessorError> {
        match self.get(name)? {
            PayloadValue::Str(s) => Ok(s),
            _ => Err(ProcessorError::FieldType {
                name,
                expected: "string",
            }),
        }
    }

    /// Required 32-byte field.
    pub fn bytes32(&self, name: &'static str) -> Result<B256, ProcessorError> {
        match self.get(name)? {
            PayloadValue::Bytes32(b) => Ok(*b),
            _ => Err(ProcessorError::FieldType {
                name,
                expected: "bytes32",
            }),
        }
    }

    /// Optional address field: absent keys yield `None`, mistyped keys are
    /// still an error.
    pub fn opt_address(&self, name: &'static str) -> Result<Option<Address>, ProcessorError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(PayloadValue::Address(a)) => Ok(Some(*a)),
            Some(_) => Err(ProcessorError::FieldType {
                name,
                expected: "address",
            }),
        }
    }

    /// Optional unsigned integer field.
    pub fn opt_uint(&self, name: &'static str) -> Result<Option<U256>, ProcessorError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(PayloadValue::Uint(u)) => Ok(Some(*u)),
            Some(_) => Err(ProcessorError::FieldType {
                name,
                expected: "uint",
            }),
        }
    }

    /// Optional string field.
    pub fn opt_str(&self, name: &'static str) -> Result<Option<&str>, ProcessorError> {
        match self.0.get(name) {
            None => Ok(None),
            Some(PayloadValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(ProcessorError::FieldType {
                name,
                expected: "string",
            }),
        }
    }

    /// Render every entry as strings, for audit metadata.
    pub fn render_all(&self) -> std::collections::BTreeMap<String, String> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.render()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> EventPayload {
        EventPayload::new()
            .with("listingAddress", PayloadValue::Address(Address::repeat_byte(0x11)))
            .with("deposit", PayloadValue::Uint(U256::from(500)))
            .with("data", PayloadValue::Str("charter".to_string()))
    }

    #[test]
    fn typed_accessors_decode_present_fields() {
        let p = payload();
        assert_eq!(p.address("listingAddress").unwrap(), Address::repeat_byte(0x11));
        assert_eq!(p.uint("deposit").unwrap(), U256::from(500));
        assert_eq!(p.str_("data").unwrap(), "charter");
        assert_eq!(p.opt_uint("missing").unwrap(), None);
    }

    #[test]
    fn missing_field_is_a_typed_error() {
        let err = payload().address("applicant").unwrap_err();
        assert!(matches!(err, ProcessorError::MissingField { name: "applicant" }));
    }

    #[test]
    fn mistyped_field_is_a_typed_error() {
        let err = payload().uint("data").unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::FieldType { name: "data", expected: "uint" }
        ));
    }

    #[test]
    fn base_name_trims_source_markers() {
        let event = Event {
            contract_kind: ContractKind::Registry,
            contract_address: Address::ZERO,
            name: "_Application".to_string(),
            payload: EventPayload::new(),
            timestamp: 0,
            provenance: EventProvenance {
                block_number: 0,
                tx_hash: B256::ZERO,
                tx_index: 0,
                block_hash: B256::ZERO,
                log_index: 0,
            },
        };
        assert_eq!(event.base_name(), "Application");
    }
}
