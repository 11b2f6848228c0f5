//! Error types for the core crate.

use thiserror::Error;

/// Core error type.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A string code did not name a known governance state.
    #[error("Unknown governance state: {0}")]
    UnknownGovernanceState(String),

    /// A string code did not name a known contract kind.
    #[error("Unknown contract kind: {0}")]
    UnknownContractKind(String),

    /// A string code did not name a known owner action.
    #[error("Unknown owner action: {0}")]
    UnknownOwnerAction(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

/// Result type alias for CoreError.
pub type Result<T> = std::result::Result<T, CoreError>;
