//! tornado-deploy: orchestration of multi-region Tornado deployments.
//!
//! A deployment is composed of three cloud resources deployed in order:
//! a compute function, an API gateway in front of it, and DNS records
//! pointing custom domains at the gateway. This crate sequences those
//! stages, threads gateway addresses into the DNS stage, aggregates the
//! per-region outputs and tears everything down again from persisted state.
//!
//! # Components
//!
//! - **`collaborator`**: async traits for the external cloud APIs
//! - **`orchestrator`**: deploy phases, teardown and remove
//! - **`output`**: single- and multi-region output shapes
//! - **`stage`**: runtime shim staging into the code directory
//! - **`sandbox`**: deterministic in-process cloud for local runs and tests

pub mod collaborator;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod sandbox;
pub mod stage;

pub use collaborator::*;
pub use error::{
    DeployError, DeployResult, PartialTeardownError, RemoveError, ResourceKind, Stage,
    TeardownFailure,
};
pub use orchestrator::{DeployPhase, DeployPlan, Orchestrator};
pub use output::{AggregatedOutput, RegionOutput, gateway_url};
pub use sandbox::{Inventory, Operation, SandboxCall, SandboxCloud};
pub use stage::{ShimSource, ShimStager};
