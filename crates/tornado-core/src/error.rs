//! Error types for input loading, normalization and placeholder resolution.

use thiserror::Error;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while turning an input document into region configs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'project_name' is required in the input document")]
    MissingProjectName,

    #[error("failed to read input document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse input document: {0}")]
    Parse(String),

    #[error("malformed field `{field}`: {reason}")]
    Malformed { field: String, reason: String },

    #[error("malformed override for region `{region}`: {reason}")]
    RegionOverride { region: String, reason: String },
}

/// A DNS record still pointed at a region whose address is unknown.
///
/// Only reachable through incorrect stage ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record for `{domain}` is still pending on region `{region}`")]
pub struct UnresolvedPlaceholder {
    pub domain: String,
    pub region: String,
}
