//! Deploy, teardown and remove errors.

use std::fmt;

use thiserror::Error;
use tornado_core::{ConfigError, UnresolvedPlaceholder};
use tornado_state::StateError;

pub type DeployResult<T> = Result<T, DeployError>;

/// Collaborator a deploy step was talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Staging,
    DomainCheck,
    Function,
    Gateway,
    Dns,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Staging => "file staging",
            Stage::DomainCheck => "domain check",
            Stage::Function => "function",
            Stage::Gateway => "gateway",
            Stage::Dns => "dns",
        })
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Placeholder(#[from] UnresolvedPlaceholder),

    #[error("{stage} stage failed: {source}")]
    Collaborator {
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("{stage} stage returned no output for region {region}")]
    MissingRegionOutput { stage: Stage, region: String },

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl DeployError {
    pub(crate) fn collaborator(stage: Stage) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| DeployError::Collaborator { stage, source }
    }
}

/// Kind of resource a removal call targeted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Function,
    Gateway,
    Dns { domain: String },
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Function => f.write_str("function"),
            ResourceKind::Gateway => f.write_str("gateway"),
            ResourceKind::Dns { domain } => write!(f, "dns ({domain})"),
        }
    }
}

#[derive(Debug)]
pub struct TeardownFailure {
    pub resource: ResourceKind,
    pub source: anyhow::Error,
}

/// Every removal that failed during one teardown.
#[derive(Debug, Error)]
#[error("teardown incomplete: {}", summarize(.failures))]
pub struct PartialTeardownError {
    pub failures: Vec<TeardownFailure>,
}

impl PartialTeardownError {
    pub fn failed(&self, resource: &ResourceKind) -> bool {
        self.failures.iter().any(|f| &f.resource == resource)
    }
}

fn summarize(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.resource, f.source))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum RemoveError {
    #[error(transparent)]
    Teardown(#[from] PartialTeardownError),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}
