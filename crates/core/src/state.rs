//! Governance state and contract family enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Lifecycle state of a registry listing.
///
/// Transitions are driven exclusively by registry-governance events; the
/// registry sub-processor is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceState {
    /// No governance action has been recorded.
    None,
    /// An application has been submitted and is in its challenge window.
    Applied,
    /// An open challenge exists against the listing.
    Challenged,
    /// The application survived its window (or a challenge) and the listing
    /// is whitelisted.
    AppWhitelisted,
    /// The application was removed before whitelisting.
    AppRemoved,
    /// The listing was removed from the registry.
    Removed,
    /// The owner withdrew the listing voluntarily.
    Withdrawn,
}

impl GovernanceState {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            GovernanceState::None => "none",
            GovernanceState::Applied => "applied",
            GovernanceState::Challenged => "challenged",
            GovernanceState::AppWhitelisted => "app_whitelisted",
            GovernanceState::AppRemoved => "app_removed",
            GovernanceState::Removed => "removed",
            GovernanceState::Withdrawn => "withdrawn",
        }
    }
}

impl fmt::Display for GovernanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GovernanceState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(GovernanceState::None),
            "applied" => Ok(GovernanceState::Applied),
            "challenged" => Ok(GovernanceState::Challenged),
            "app_whitelisted" => Ok(GovernanceState::AppWhitelisted),
            "app_removed" => Ok(GovernanceState::AppRemoved),
            "removed" => Ok(GovernanceState::Removed),
            "withdrawn" => Ok(GovernanceState::Withdrawn),
            _ => Err(CoreError::UnknownGovernanceState(s.to_string())),
        }
    }
}

/// Contract family that emitted an event.
///
/// Each event in the shared stream belongs to exactly one family; routing
/// is keyed on `(ContractKind, event name)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// The token-curated registry contract.
    Registry,
    /// The commit/reveal voting contract.
    Voting,
    /// The parameter-governance contract.
    Parameterizer,
    /// The government parameter contract.
    Government,
    /// A per-listing content registry contract.
    ContentRegistry,
    /// The token contract.
    Token,
    /// An administrative multi-signature wallet.
    MultiSig,
}

impl ContractKind {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractKind::Registry => "registry",
            ContractKind::Voting => "voting",
            ContractKind::Parameterizer => "parameterizer",
            ContractKind::Government => "government",
            ContractKind::ContentRegistry => "content_registry",
            ContractKind::Token => "token",
            ContractKind::MultiSig => "multi_sig",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registry" => Ok(ContractKind::Registry),
            "voting" => Ok(ContractKind::Voting),
            "parameterizer" => Ok(ContractKind::Parameterizer),
            "government" => Ok(ContractKind::Government),
            "content_registry" => Ok(ContractKind::ContentRegistry),
            "token" => Ok(ContractKind::Token),
            "multi_sig" => Ok(ContractKind::MultiSig),
            _ => Err(CoreError::UnknownContractKind(s.to_string())),
        }
    }
}
