//! Boundaries to the cloud services a deployment is composed of.
//!
//! Each trait is one external API. Implementations must be `Send + Sync`
//! so they can be shared behind `Arc` by the orchestrator.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tornado_core::{CheckedDomain, DomainRecordRequest, FunctionSettings, GatewaySettings};
use tornado_state::{FunctionResourceRef, GatewayResourceRef};

/// Per-region outputs keyed by region id.
pub type RegionOutputs<T> = BTreeMap<String, T>;

// ── Domain check ───────────────────────────────────────────────────

#[async_trait]
pub trait DomainChecker: Send + Sync {
    /// Split a custom domain into its registrable domain and host part.
    async fn check(&self, domain: &str) -> anyhow::Result<CheckedDomain>;
}

// ── Function ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeployRequest {
    pub region: String,
    pub function: FunctionSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDeployment {
    pub function_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionRemoval {
    pub function: FunctionResourceRef,
    pub client_remark: String,
}

#[async_trait]
pub trait FunctionDeployer: Send + Sync {
    /// Deploy the function to every requested region in one call.
    async fn deploy(
        &self,
        requests: &[FunctionDeployRequest],
    ) -> anyhow::Result<RegionOutputs<FunctionDeployment>>;

    async fn remove(&self, removal: &FunctionRemoval) -> anyhow::Result<()>;
}

// ── Gateway ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayDeployRequest {
    pub region: String,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayDeployment {
    pub service_id: String,
    /// Address assigned to the service, the target of custom-domain records.
    pub sub_domain: String,
    pub protocols: Vec<String>,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRemoval {
    pub gateway: GatewayResourceRef,
    pub client_remark: String,
}

#[async_trait]
pub trait GatewayDeployer: Send + Sync {
    async fn deploy(
        &self,
        requests: &[GatewayDeployRequest],
    ) -> anyhow::Result<RegionOutputs<GatewayDeployment>>;

    async fn remove(&self, removal: &GatewayRemoval) -> anyhow::Result<()>;
}

// ── DNS ────────────────────────────────────────────────────────────

/// Records for one domain. Only resolved records can be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDeployRequest {
    pub domain: String,
    pub records: Vec<DomainRecordRequest<String>>,
    pub client_remark: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsDeployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRemoval {
    pub domain: String,
    pub client_remark: String,
}

#[async_trait]
pub trait DnsDeployer: Send + Sync {
    async fn deploy(&self, request: &DnsDeployRequest) -> anyhow::Result<DnsDeployment>;

    async fn remove(&self, removal: &DnsRemoval) -> anyhow::Result<()>;
}

// ── File staging ───────────────────────────────────────────────────

#[async_trait]
pub trait FileStager: Send + Sync {
    /// Install the runtime shim under `code_uri` for `project_name`.
    async fn stage(&self, code_uri: &Path, project_name: &str) -> anyhow::Result<()>;
}

/// The full set of services one orchestrator talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub domains: Arc<dyn DomainChecker>,
    pub functions: Arc<dyn FunctionDeployer>,
    pub gateways: Arc<dyn GatewayDeployer>,
    pub dns: Arc<dyn DnsDeployer>,
    pub stager: Arc<dyn FileStager>,
}
