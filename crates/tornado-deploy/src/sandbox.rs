//! SandboxCloud: deterministic in-process stand-in for the cloud APIs.
//!
//! Identifiers are derived from SHA-256 digests of the request, so the same
//! input always yields the same function ids, service ids and subdomains.
//! Every call is recorded, and individual operations can be made to fail
//! for exercising partial-failure paths.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tornado_core::CheckedDomain;
use tracing::debug;

use crate::collaborator::*;

/// Suffix of every gateway subdomain handed out by the sandbox.
pub const SANDBOX_APIGW_SUFFIX: &str = "apigw.sandbox.tornado";

/// Operation a failure can be injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    DomainCheck,
    FunctionDeploy,
    FunctionRemove,
    GatewayDeploy,
    GatewayRemove,
    DnsDeploy,
    DnsRemove,
}

/// One recorded collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxCall {
    DomainCheck { domain: String },
    FunctionDeploy { regions: Vec<String> },
    FunctionRemove { name: String },
    GatewayDeploy { regions: Vec<String> },
    GatewayRemove { service_ids: Vec<String> },
    DnsDeploy { request: DnsDeployRequest },
    DnsRemove { domain: String },
}

impl SandboxCall {
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            SandboxCall::FunctionRemove { .. }
                | SandboxCall::GatewayRemove { .. }
                | SandboxCall::DnsRemove { .. }
        )
    }
}

/// Resources currently live in the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// (region, function id)
    pub functions: BTreeSet<(String, String)>,
    pub services: BTreeSet<String>,
    pub domains: BTreeSet<String>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty() && self.services.is_empty() && self.domains.is_empty()
    }
}

#[derive(Debug, Default)]
struct SandboxState {
    calls: Vec<SandboxCall>,
    inventory: Inventory,
    failing: HashSet<Operation>,
    /// Regions a deploy call silently leaves out of its output.
    omitted: HashSet<(Operation, String)>,
}

#[derive(Debug, Default)]
pub struct SandboxCloud {
    state: Mutex<SandboxState>,
}

impl SandboxCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wire this sandbox in as every cloud collaborator.
    pub fn collaborators(self: &Arc<Self>, stager: Arc<dyn FileStager>) -> Collaborators {
        Collaborators {
            domains: self.clone(),
            functions: self.clone(),
            gateways: self.clone(),
            dns: self.clone(),
            stager,
        }
    }

    /// Make every later call of `op` fail.
    pub async fn fail_on(&self, op: Operation) {
        self.state.lock().await.failing.insert(op);
    }

    pub async fn recover(&self, op: Operation) {
        self.state.lock().await.failing.remove(&op);
    }

    /// Leave `region` out of the output of `op` (a deploy operation).
    pub async fn omit_region(&self, op: Operation, region: &str) {
        self.state
            .lock()
            .await
            .omitted
            .insert((op, region.to_string()));
    }

    pub async fn calls(&self) -> Vec<SandboxCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn inventory(&self) -> Inventory {
        self.state.lock().await.inventory.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }
}

impl SandboxState {
    fn record(&mut self, op: Operation, call: SandboxCall) -> Result<()> {
        self.calls.push(call);
        if self.failing.contains(&op) {
            bail!("sandbox: injected failure in {op:?}");
        }
        Ok(())
    }

    fn omits(&self, op: Operation, region: &str) -> bool {
        self.omitted.contains(&(op, region.to_string()))
    }
}

/// `<prefix>-<first 8 bytes of sha256(parts)>`, hex encoded.
pub fn sandbox_id(prefix: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    format!("{prefix}-{}", hex::encode(&digest[..8]))
}

/// Split `www.example.com` into `example.com` + `www`.
pub fn split_domain(domain: &str) -> CheckedDomain {
    let domain = domain.trim().trim_end_matches('.');
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() <= 2 {
        return CheckedDomain {
            domain: domain.to_string(),
            sub_domain: None,
        };
    }
    let split = labels.len() - 2;
    CheckedDomain {
        domain: labels[split..].join("."),
        sub_domain: Some(labels[..split].join(".")),
    }
}

#[async_trait]
impl DomainChecker for SandboxCloud {
    async fn check(&self, domain: &str) -> Result<CheckedDomain> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::DomainCheck,
            SandboxCall::DomainCheck {
                domain: domain.to_string(),
            },
        )?;
        if domain.trim().is_empty() || !domain.contains('.') {
            bail!("sandbox: `{domain}` is not a registrable domain");
        }
        Ok(split_domain(domain))
    }
}

#[async_trait]
impl FunctionDeployer for SandboxCloud {
    async fn deploy(
        &self,
        requests: &[FunctionDeployRequest],
    ) -> Result<RegionOutputs<FunctionDeployment>> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::FunctionDeploy,
            SandboxCall::FunctionDeploy {
                regions: requests.iter().map(|r| r.region.clone()).collect(),
            },
        )?;

        let mut outputs = RegionOutputs::new();
        for request in requests {
            let function_id = sandbox_id("fn", &[&request.region, &request.function.name]);
            state
                .inventory
                .functions
                .insert((request.region.clone(), function_id.clone()));
            debug!(region = %request.region, %function_id, "sandbox function deployed");
            if state.omits(Operation::FunctionDeploy, &request.region) {
                continue;
            }
            outputs.insert(request.region.clone(), FunctionDeployment { function_id });
        }
        Ok(outputs)
    }

    async fn remove(&self, removal: &FunctionRemoval) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::FunctionRemove,
            SandboxCall::FunctionRemove {
                name: removal.function.name.clone(),
            },
        )?;
        for (region, id) in &removal.function.regions {
            state.inventory.functions.remove(&(region.clone(), id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl GatewayDeployer for SandboxCloud {
    async fn deploy(
        &self,
        requests: &[GatewayDeployRequest],
    ) -> Result<RegionOutputs<GatewayDeployment>> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::GatewayDeploy,
            SandboxCall::GatewayDeploy {
                regions: requests.iter().map(|r| r.region.clone()).collect(),
            },
        )?;

        let mut outputs = RegionOutputs::new();
        for request in requests {
            let gateway = &request.gateway;
            let function = gateway
                .endpoints
                .first()
                .map(|e| e.function.function_name.as_str())
                .unwrap_or_default();
            let service_id = match &gateway.service_id {
                Some(id) => id.clone(),
                None => sandbox_id("service", &[&request.region, function]),
            };
            let sub_domain = format!("{service_id}.{}.{SANDBOX_APIGW_SUFFIX}", request.region);
            state.inventory.services.insert(service_id.clone());
            debug!(region = %request.region, %service_id, %sub_domain, "sandbox gateway deployed");
            if state.omits(Operation::GatewayDeploy, &request.region) {
                continue;
            }
            outputs.insert(
                request.region.clone(),
                GatewayDeployment {
                    service_id,
                    sub_domain,
                    protocols: gateway.protocols.clone(),
                    environment: gateway.environment.clone(),
                },
            );
        }
        Ok(outputs)
    }

    async fn remove(&self, removal: &GatewayRemoval) -> Result<()> {
        let mut state = self.state.lock().await;
        let service_ids: Vec<String> = removal
            .gateway
            .regions
            .values()
            .map(|g| g.service_id.clone())
            .collect();
        state.record(
            Operation::GatewayRemove,
            SandboxCall::GatewayRemove {
                service_ids: service_ids.clone(),
            },
        )?;
        for id in &service_ids {
            state.inventory.services.remove(id);
        }
        Ok(())
    }
}

#[async_trait]
impl DnsDeployer for SandboxCloud {
    async fn deploy(&self, request: &DnsDeployRequest) -> Result<DnsDeployment> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::DnsDeploy,
            SandboxCall::DnsDeploy {
                request: request.clone(),
            },
        )?;
        state.inventory.domains.insert(request.domain.clone());

        if request.records.is_empty() {
            return Ok(DnsDeployment::default());
        }
        let values: Vec<&str> = request.records.iter().map(|r| r.value.as_str()).collect();
        let mut parts = vec![request.domain.as_str()];
        parts.extend(values);
        Ok(DnsDeployment {
            dns_id: Some(sandbox_id("dns", &parts)),
        })
    }

    async fn remove(&self, removal: &DnsRemoval) -> Result<()> {
        let mut state = self.state.lock().await;
        state.record(
            Operation::DnsRemove,
            SandboxCall::DnsRemove {
                domain: removal.domain.clone(),
            },
        )?;
        state.inventory.domains.remove(&removal.domain);
        Ok(())
    }
}
