//! Error types for the processing engine.

use thiserror::Error;

use crate::persistence::StoreError;
use tcr_core::ContractKind;

/// Error raised while processing a single event.
///
/// Fatal to that event only; the engine logs it and continues with the
/// rest of the batch.
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// A required payload key was absent.
    #[error("missing required payload field '{name}'")]
    MissingField {
        /// Name of the absent key.
        name: &'static str,
    },

    /// A payload key held a value of the wrong type.
    #[error("payload field '{name}' is not a {expected}")]
    FieldType {
        /// Name of the mistyped key.
        name: &'static str,
        /// Expected type description.
        expected: &'static str,
    },

    /// An event referenced an aggregate that should already exist.
    #[error("no {kind} found for key {key}")]
    MissingAggregate {
        /// Aggregate kind description.
        kind: &'static str,
        /// Lookup key, rendered for diagnostics.
        key: String,
    },

    /// A persistence port call failed.
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
}

/// Error raised by the dispatching engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Two handlers registered the same `(kind, name)` route.
    #[error("duplicate route for {kind} event '{name}'")]
    DuplicateRoute {
        /// Contract family of the conflicting route.
        kind: ContractKind,
        /// Normalized event name of the conflicting route.
        name: String,
    },

    /// The last event failure observed in a batch.
    #[error("event #{index} ({name}) failed: {source}")]
    Event {
        /// Zero-based index of the failing event within the batch.
        index: usize,
        /// Raw event name, for diagnostics.
        name: String,
        /// The underlying processor error.
        source: ProcessorError,
    },
}
