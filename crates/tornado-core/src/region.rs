//! Region override resolution.
//!
//! Every region starts from a copy of the canonical blocks; a region's
//! `regions.<id>` override blocks are merged on top (override wins) and the
//! result is deserialized back into the typed settings.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::merge_maps;
use crate::types::*;

/// Produce one [`RegionConfig`] per region, in region-list order.
pub fn resolve_regions(config: &CanonicalConfig) -> ConfigResult<Vec<RegionConfig>> {
    config
        .regions
        .iter()
        .map(|region| resolve_region(config, region))
        .collect()
}

fn resolve_region(config: &CanonicalConfig, region: &str) -> ConfigResult<RegionConfig> {
    let overrides = config.overrides.get(region);

    let mut function = match overrides.and_then(|o| o.function.as_ref()) {
        Some(patch) => overlay(region, "function", &config.function, patch)?,
        None => config.function.clone(),
    };
    if function.code != config.function.code {
        // The shim is staged under each region's own code location.
        let stale = config.function.shim_include();
        function.include.retain(|entry| *entry != stale);
    }
    function.ensure_forced_paths();

    let mut gateway = match overrides.and_then(|o| o.gateway.as_ref()) {
        Some(patch) => overlay(region, "gateway", &config.gateway, patch)?,
        None => config.gateway.clone(),
    };
    let endpoint = EndpointSpec::catch_all(&function.name, function.namespace.clone());
    if gateway.endpoints.len() != 1 || gateway.endpoints[0] != endpoint {
        if gateway.endpoints.len() > 1 {
            warn!(%region, "gateway endpoints cannot be overridden per region");
        }
        gateway.endpoints = vec![endpoint];
    }

    let dns_base = match overrides.and_then(|o| o.dns.as_ref()) {
        Some(patch) => overlay(region, "dns", &config.dns, patch)?,
        None => config.dns.clone(),
    };
    let dns = RegionDnsSettings::from_base(&dns_base);

    debug!(
        %region,
        function = %function.name,
        record_line = ?dns.record_line,
        overridden = overrides.is_some(),
        "region resolved"
    );

    Ok(RegionConfig {
        region: region.to_string(),
        function,
        gateway,
        dns,
    })
}

/// Merge `patch` onto a serialized copy of `base` and read it back.
fn overlay<T>(region: &str, block: &str, base: &T, patch: &Map<String, Value>) -> ConfigResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |e: serde_json::Error| ConfigError::RegionOverride {
        region: region.to_string(),
        reason: format!("{block}: {e}"),
    };

    // Settings structs always serialize to a table.
    let mut target = serde_json::to_value(base).map_err(invalid)?;
    if let Value::Object(map) = &mut target {
        merge_maps(patch, map);
    }
    serde_json::from_value(target).map_err(invalid)
}
