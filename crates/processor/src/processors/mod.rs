//! Domain sub-processors, one per contract family.
//!
//! Each processor implements [`EventHandler`]: it claims events by
//! `(contract kind, normalized name)`, decodes the payload at its
//! boundary, checks aggregate state for idempotency and legality, and
//! projects the transition through the persistence ports.

use async_trait::async_trait;

use crate::error::ProcessorError;
use crate::event::Event;
use tcr_core::ContractKind;

pub mod content;
pub mod multisig;
pub mod parameterizer;
pub mod registry;
pub mod token;
pub mod voting;

pub use content::ContentProcessor;
pub use multisig::MultiSigProcessor;
pub use parameterizer::ParameterizerProcessor;
pub use registry::RegistryProcessor;
pub use token::TokenProcessor;
pub use voting::VotingProcessor;

/// Common contract of the domain sub-processors.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Contract families this handler owns.
    fn contract_kinds(&self) -> &'static [ContractKind];

    /// Normalized (marker-trimmed) event names this handler claims.
    fn event_names(&self) -> &'static [&'static str];

    /// Process one event.
    ///
    /// Returns `Ok(false)` when the event's kind/name is outside this
    /// handler's family, which is not an error. `Ok(true)` means the event was
    /// claimed and its transition applied.
    async fn process(&self, event: &Event) -> Result<bool, ProcessorError>;
}

/// Membership check shared by every handler's `process` entry.
pub(crate) fn claims(handler: &dyn EventHandler, event: &Event) -> bool {
    handler.contract_kinds().contains(&event.contract_kind)
        && handler.event_names().contains(&event.base_name())
}

/// Turn a `NoResults` lookup into a missing-aggregate processor error, for
/// transitions where the aggregate must already exist.
pub(crate) fn require<T>(
    result: Result<T, crate::persistence::StoreError>,
    kind: &'static str,
    key: impl std::fmt::Display,
) -> Result<T, ProcessorError> {
    match result {
        Ok(value) => Ok(value),
        Err(crate::persistence::StoreError::NoResults) => Err(ProcessorError::MissingAggregate {
            kind,
            key: key.to_string(),
        }),
        Err(err) => Err(err.into()),
    }
}
