//! Input normalization: raw document to [`CanonicalConfig`].
//!
//! Applies the defaulting cascade for every field, injects the forced
//! include/exclude entries and synthesizes the single catch-all gateway
//! endpoint. Normalization is pure: file staging happens later, in the
//! orchestrator, right before the function stage.

use std::path::PathBuf;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::{FunctionInput, InputDocument};
use crate::error::ConfigResult;
use crate::naming::random_function_name;
use crate::types::*;

pub const DEFAULT_REGION: &str = "ap-guangzhou";
pub const DEFAULT_HANDLER: &str = "index.main_handler";
pub const DEFAULT_RUNTIME: &str = "Python3.6";
pub const DEFAULT_CLIENT_REMARK: &str = "tencent-tornado";
pub const DEFAULT_PROTOCOL: &str = "http";
pub const DEFAULT_GATEWAY_ENVIRONMENT: &str = "release";
pub const GATEWAY_DESCRIPTION: &str = "Tornado web application gateway";

/// Defaults applied when a `[function]` block is present.
pub const DEFAULT_TIMEOUT_SECS: u32 = 3;
pub const DEFAULT_MEMORY_MB: u32 = 128;

/// Gateway keys owned by the normalizer; user values for them are dropped.
const RESERVED_GATEWAY_KEYS: &[&str] = &[
    "endpoints",
    "description",
    "service_name",
    "service_id",
    "client_remark",
];

/// Environment the normalizer runs in.
#[derive(Debug, Clone)]
pub struct NormalizeContext {
    /// Fallback code location.
    pub working_dir: PathBuf,
    /// Function name from the last successful deploy, if any.
    pub previous_function_name: Option<String>,
}

impl NormalizeContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            previous_function_name: None,
        }
    }

    pub fn with_previous_name(mut self, name: Option<String>) -> Self {
        self.previous_function_name = name;
        self
    }
}

/// Build the canonical configuration for `input`.
///
/// `rng` is only consulted when neither an explicit nor a previously
/// persisted function name exists.
pub fn normalize<R: Rng + ?Sized>(
    input: &InputDocument,
    ctx: &NormalizeContext,
    rng: &mut R,
) -> ConfigResult<CanonicalConfig> {
    let project_name = input.project_name()?.to_string();
    let fields = input.fields()?;
    let overrides = input.region_overrides()?;

    let has_function_block = fields.function.is_some();
    let block = fields.function.unwrap_or_default();

    let name = non_blank(fields.function_name)
        .or_else(|| ctx.previous_function_name.clone())
        .unwrap_or_else(|| random_function_name(rng));

    let code = block
        .code
        .clone()
        .or(fields.code)
        .map(PathBuf::from)
        .unwrap_or_else(|| ctx.working_dir.clone());

    let regions = normalize_regions(fields.region.map(|r| r.into_vec()).unwrap_or_default());
    let client_remark =
        non_blank(fields.client_remark).unwrap_or_else(|| DEFAULT_CLIENT_REMARK.to_string());

    let mut function = FunctionSettings {
        name,
        code,
        handler: non_blank(block.handler.clone().or(fields.handler))
            .unwrap_or_else(|| DEFAULT_HANDLER.to_string()),
        runtime: non_blank(block.runtime.clone().or(fields.runtime))
            .unwrap_or_else(|| DEFAULT_RUNTIME.to_string()),
        include: block.include.clone().or(fields.include).unwrap_or_default(),
        exclude: block.exclude.clone().or(fields.exclude).unwrap_or_default(),
        timeout: None,
        memory_size: None,
        environment: None,
        vpc: None,
        namespace: block.namespace.clone(),
        client_remark: client_remark.clone(),
    };
    if has_function_block {
        apply_resource_settings(&mut function, block);
    }
    function.ensure_forced_paths();

    let gateway_input = fields.gateway.unwrap_or_default();
    let mut extra = gateway_input.extra;
    for key in RESERVED_GATEWAY_KEYS {
        if extra.remove(*key).is_some() {
            warn!(%key, "ignoring reserved gateway key in input document");
        }
    }
    let gateway = GatewaySettings {
        service_name: non_blank(fields.service_name),
        service_id: non_blank(fields.service_id),
        description: GATEWAY_DESCRIPTION.to_string(),
        protocols: gateway_input
            .protocols
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_PROTOCOL.to_string()]),
        environment: non_blank(gateway_input.environment)
            .unwrap_or_else(|| DEFAULT_GATEWAY_ENVIRONMENT.to_string()),
        endpoints: vec![EndpointSpec::catch_all(
            &function.name,
            function.namespace.clone(),
        )],
        custom_domains: distinct_domains(gateway_input.custom_domains.unwrap_or_default()),
        client_remark,
        extra,
    };

    for region in overrides.keys() {
        if !regions.contains(region) {
            debug!(%region, "override block for a region that is not deployed");
        }
    }

    debug!(
        project = %project_name,
        function = %function.name,
        regions = ?regions,
        custom_domains = gateway.custom_domains.len(),
        "input normalized"
    );

    Ok(CanonicalConfig {
        project_name,
        regions,
        function,
        gateway,
        dns: fields.dns.unwrap_or_default(),
        overrides,
    })
}

fn apply_resource_settings(function: &mut FunctionSettings, block: FunctionInput) {
    function.timeout = Some(block.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS));
    function.memory_size = Some(block.memory_size.unwrap_or(DEFAULT_MEMORY_MB));
    function.environment = block.environment;
    function.vpc = block.vpc;
}

/// Drop blanks and duplicates, keep order, never return an empty list.
fn normalize_regions(raw: Vec<String>) -> Vec<String> {
    let mut regions: Vec<String> = Vec::with_capacity(raw.len());
    for region in raw {
        let region = region.trim();
        if region.is_empty() {
            continue;
        }
        if regions.iter().any(|r| r == region) {
            warn!(%region, "duplicate region in input document");
            continue;
        }
        regions.push(region.to_string());
    }
    if regions.is_empty() {
        regions.push(DEFAULT_REGION.to_string());
    }
    regions
}

/// Drop structurally equal custom-domain entries, keeping first-seen order.
fn distinct_domains(raw: Vec<CustomDomain>) -> Vec<CustomDomain> {
    let mut domains: Vec<CustomDomain> = Vec::with_capacity(raw.len());
    for domain in raw {
        if domains.contains(&domain) {
            warn!(domain = %domain.domain, "duplicate custom domain in input document");
            continue;
        }
        domains.push(domain);
    }
    domains
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
