//! Deployment orchestrator: drives function, gateway and DNS stages.
//!
//! A deploy moves linearly through [`DeployPhase`]s. Every stage runs to
//! completion before the next one starts, and any failure aborts the rest
//! of the run. State is persisted only once the run reaches `Done`, so a
//! failed deploy leaves whatever was stored before untouched.
//!
//! Teardown is best-effort: each removal is attempted regardless of earlier
//! failures and the failures are reported together.

use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::Serialize;
use tornado_core::{
    CanonicalConfig, CheckedDomain, DomainRecordRequest, InputDocument, NormalizeContext,
    RegionConfig, ResolvedDomainPlan, build_placeholder_records, normalize,
    resolve_placeholders, resolve_regions,
};
use tornado_state::{
    DeploymentState, FunctionResourceRef, GatewayRegionRef, GatewayResourceRef, StateStore,
};
use tracing::{debug, info, warn};

use crate::collaborator::*;
use crate::error::*;
use crate::output::AggregatedOutput;

/// Current phase of a deploy run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeployPhase {
    /// Shim staged, domains checked, DNS records planned.
    Start,
    FunctionDeployed,
    GatewayDeployed,
    /// Placeholders resolved and DNS records deployed.
    DnsResolved,
    /// Outputs aggregated and state persisted.
    Done,
}

impl DeployPhase {
    pub fn next(self) -> Option<DeployPhase> {
        match self {
            DeployPhase::Start => Some(DeployPhase::FunctionDeployed),
            DeployPhase::FunctionDeployed => Some(DeployPhase::GatewayDeployed),
            DeployPhase::GatewayDeployed => Some(DeployPhase::DnsResolved),
            DeployPhase::DnsResolved => Some(DeployPhase::Done),
            DeployPhase::Done => None,
        }
    }
}

/// Everything a deploy would do, computed without side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeployPlan {
    pub canonical: CanonicalConfig,
    pub regions: Vec<RegionConfig>,
}

/// Progress of one deploy, for logging.
struct DeployRun<'a> {
    project: &'a str,
    phase: DeployPhase,
}

impl<'a> DeployRun<'a> {
    fn start(project: &'a str) -> Self {
        info!(%project, phase = ?DeployPhase::Start, "deploy started");
        Self {
            project,
            phase: DeployPhase::Start,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.phase.next() {
            info!(project = %self.project, from = ?self.phase, to = ?next, "deploy phase advanced");
            self.phase = next;
        }
    }
}

pub struct Orchestrator {
    collaborators: Collaborators,
    store: StateStore,
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, store: StateStore) -> Self {
        Self {
            collaborators,
            store,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Normalize `input` and resolve its regions, reusing the function name
    /// of the project's previous deploy when no explicit name is given.
    pub fn plan_input<R: Rng + ?Sized>(
        &self,
        input: &InputDocument,
        working_dir: &Path,
        rng: &mut R,
    ) -> DeployResult<DeployPlan> {
        let project = input.project_name()?;
        let previous = self.store.get_deployment(project)?;
        let ctx = NormalizeContext::new(working_dir)
            .with_previous_name(previous.map(|state| state.function.name));
        let canonical = normalize(input, &ctx, rng)?;
        let regions = resolve_regions(&canonical)?;
        debug!(%project, regions = regions.len(), "deploy planned");
        Ok(DeployPlan { canonical, regions })
    }

    /// Plan and deploy `input` in one go.
    pub async fn deploy_input<R: Rng + ?Sized>(
        &self,
        input: &InputDocument,
        working_dir: &Path,
        rng: &mut R,
    ) -> DeployResult<AggregatedOutput> {
        let plan = self.plan_input(input, working_dir, rng)?;
        self.deploy(&plan.canonical, &plan.regions).await
    }

    /// Run every stage for `regions` and persist the resulting state.
    pub async fn deploy(
        &self,
        canonical: &CanonicalConfig,
        regions: &[RegionConfig],
    ) -> DeployResult<AggregatedOutput> {
        let project = canonical.project_name.as_str();
        let mut run = DeployRun::start(project);
        let remark = canonical.function.client_remark.clone();

        // Start
        let mut staged: Vec<&Path> = Vec::new();
        for code in regions.iter().map(|rc| rc.function.code.as_path()) {
            if staged.contains(&code) {
                continue;
            }
            self.collaborators
                .stager
                .stage(code, project)
                .await
                .map_err(DeployError::collaborator(Stage::Staging))?;
            staged.push(code);
        }

        let mut checked_names: Vec<&str> = Vec::new();
        let mut checked: Vec<CheckedDomain> = Vec::new();
        for custom in &canonical.gateway.custom_domains {
            if checked_names.contains(&custom.domain.as_str()) {
                continue;
            }
            checked_names.push(custom.domain.as_str());
            let result = self
                .collaborators
                .domains
                .check(&custom.domain)
                .await
                .map_err(DeployError::collaborator(Stage::DomainCheck))?;
            debug!(%project, domain = %custom.domain, checked = %result.domain, "domain checked");
            checked.push(result);
        }
        let plans = build_placeholder_records(&checked, regions);
        run.advance();

        // FunctionDeployed
        let requests: Vec<FunctionDeployRequest> = regions
            .iter()
            .map(|rc| FunctionDeployRequest {
                region: rc.region.clone(),
                function: rc.function.clone(),
            })
            .collect();
        let functions = self
            .collaborators
            .functions
            .deploy(&requests)
            .await
            .map_err(DeployError::collaborator(Stage::Function))?;
        require_every_region(Stage::Function, regions, &functions)?;
        run.advance();

        // GatewayDeployed
        let requests: Vec<GatewayDeployRequest> = regions
            .iter()
            .map(|rc| GatewayDeployRequest {
                region: rc.region.clone(),
                gateway: rc.gateway.clone(),
            })
            .collect();
        let gateways = self
            .collaborators
            .gateways
            .deploy(&requests)
            .await
            .map_err(DeployError::collaborator(Stage::Gateway))?;
        require_every_region(Stage::Gateway, regions, &gateways)?;
        run.advance();

        // DnsResolved
        let addresses: HashMap<String, String> = gateways
            .iter()
            .map(|(region, gw)| (region.clone(), gw.sub_domain.clone()))
            .collect();
        let resolved = resolve_placeholders(&plans, &addresses)?;
        let mut dns_id = None;
        let mut dns_domains = Vec::new();
        for (domain, records) in group_by_domain(resolved) {
            let request = DnsDeployRequest {
                domain: domain.clone(),
                records,
                client_remark: remark.clone(),
            };
            let deployed = self
                .collaborators
                .dns
                .deploy(&request)
                .await
                .map_err(DeployError::collaborator(Stage::Dns))?;
            info!(%project, %domain, records = request.records.len(), "dns records deployed");
            if deployed.dns_id.is_some() {
                dns_id = deployed.dns_id;
            }
            dns_domains.push(domain);
        }
        run.advance();

        // Done
        let output = AggregatedOutput::build(
            &canonical.function.name,
            &canonical.regions,
            &gateways,
            dns_id.clone(),
        )?;

        let now = epoch_secs();
        let mut state = DeploymentState {
            project: project.to_string(),
            regions: canonical.regions.clone(),
            client_remark: remark,
            function: FunctionResourceRef {
                name: canonical.function.name.clone(),
                namespace: canonical.function.namespace.clone(),
                regions: functions
                    .into_iter()
                    .map(|(region, f)| (region, f.function_id))
                    .collect(),
            },
            gateway: GatewayResourceRef {
                regions: gateways
                    .into_iter()
                    .map(|(region, gw)| {
                        let gateway = GatewayRegionRef {
                            service_id: gw.service_id,
                            sub_domain: gw.sub_domain,
                            environment: gw.environment,
                        };
                        (region, gateway)
                    })
                    .collect(),
            },
            dns_domains,
            dns_id,
            created_at: now,
            updated_at: now,
        };
        let previous = self.store.get_deployment(project)?;
        state.inherit_created_at(previous.as_ref());
        self.store.put_deployment(&state)?;
        run.advance();

        Ok(output)
    }

    /// Remove every resource recorded in `state`.
    pub async fn teardown(&self, state: &DeploymentState) -> Result<(), PartialTeardownError> {
        let project = state.project.as_str();
        let remark = state.client_remark.clone();
        let mut failures = Vec::new();
        info!(%project, dns_domains = state.dns_domains.len(), "teardown started");

        let removal = FunctionRemoval {
            function: state.function.clone(),
            client_remark: remark.clone(),
        };
        if let Err(source) = self.collaborators.functions.remove(&removal).await {
            warn!(%project, error = %source, "function removal failed");
            failures.push(TeardownFailure {
                resource: ResourceKind::Function,
                source,
            });
        }

        let removal = GatewayRemoval {
            gateway: state.gateway.clone(),
            client_remark: remark.clone(),
        };
        if let Err(source) = self.collaborators.gateways.remove(&removal).await {
            warn!(%project, error = %source, "gateway removal failed");
            failures.push(TeardownFailure {
                resource: ResourceKind::Gateway,
                source,
            });
        }

        for domain in &state.dns_domains {
            let removal = DnsRemoval {
                domain: domain.clone(),
                client_remark: remark.clone(),
            };
            if let Err(source) = self.collaborators.dns.remove(&removal).await {
                warn!(%project, %domain, error = %source, "dns removal failed");
                failures.push(TeardownFailure {
                    resource: ResourceKind::Dns {
                        domain: domain.clone(),
                    },
                    source,
                });
            }
        }

        if failures.is_empty() {
            info!(%project, "teardown completed");
            Ok(())
        } else {
            Err(PartialTeardownError { failures })
        }
    }

    /// Tear down `project` from its persisted state. The state record is
    /// deleted only when every removal succeeded. Returns false when nothing
    /// was recorded for the project.
    pub async fn remove(&self, project: &str) -> Result<bool, RemoveError> {
        let Some(state) = self.store.get_deployment(project)? else {
            info!(%project, "no deployment state, nothing to remove");
            return Ok(false);
        };
        self.teardown(&state).await?;
        self.store.delete_deployment(project)?;
        Ok(true)
    }
}

fn require_every_region<T>(
    stage: Stage,
    regions: &[RegionConfig],
    outputs: &RegionOutputs<T>,
) -> DeployResult<()> {
    match regions.iter().find(|rc| !outputs.contains_key(&rc.region)) {
        Some(missing) => Err(DeployError::MissingRegionOutput {
            stage,
            region: missing.region.clone(),
        }),
        None => Ok(()),
    }
}

/// Merge plans that checked down to the same domain, keeping first-seen
/// order and dropping repeated records, so each domain gets exactly one DNS
/// call.
fn group_by_domain(
    plans: Vec<ResolvedDomainPlan>,
) -> Vec<(String, Vec<DomainRecordRequest<String>>)> {
    let mut grouped: Vec<(String, Vec<_>)> = Vec::new();
    for plan in plans {
        match grouped.iter_mut().find(|(domain, _)| *domain == plan.domain) {
            Some((_, records)) => {
                for record in plan.records {
                    if !records.contains(&record) {
                        records.push(record);
                    }
                }
            }
            None => grouped.push((plan.domain, plan.records)),
        }
    }
    grouped
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
