//! Typed error surfaces for the core pipeline.
//!
//! Policy rejections (constraint failures, cancel-not-found, phase-closed)
//! are modeled as values — `OrderResult::rejected` / `RejectReason` — not
//! as `Result::Err`. These error types are reserved for load-time failures
//! and true programming faults (completion without a stored result,
//! unknown role in a fee lookup), matching the split the corpus draws
//! between `thiserror` (typed, recoverable) and faults that should never
//! happen in a correct build.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unknown phase name '{0}' in schedule (expected one of closed, pre_open, opening_auction, continuous)")]
    UnknownPhase(String),

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Raised only for conditions the spec calls faults, not business outcomes:
/// a completion signalled with no stored result, or an unknown role reaching
/// the fee/constraint lookup after config validation should have caught it.
#[derive(Debug, Error)]
pub enum CoreFault {
    #[error("coordinator signalled completion for request {0} with no stored result")]
    CompletionWithoutResult(crate::core_types::RequestId),

    #[error("unknown role '{0}' reached fee lookup")]
    UnknownRole(String),
}
