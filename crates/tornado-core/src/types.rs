//! Canonical and per-region configuration types.
//!
//! Field names double as the keys accepted in region override blocks, so a
//! `[regions.ap-shanghai.function]` table patches `FunctionSettings` by the
//! same names it serializes to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Directory inside the code location that receives the runtime shim.
pub const SHIM_DIR: &str = ".cache";

/// Exclude patterns injected into every function package.
pub const FORCED_EXCLUDES: &[&str] = &[".git/**", ".gitignore", ".serverless", ".DS_Store"];

// ── Function ──────────────────────────────────────────────────────

/// Compute function settings shared by every region unless overridden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSettings {
    pub name: String,
    /// Code location on the local filesystem.
    pub code: PathBuf,
    pub handler: String,
    pub runtime: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    /// Memory size in MB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub client_remark: String,
}

impl FunctionSettings {
    /// Path of the staged shim directory, always shipped with the package.
    pub fn shim_include(&self) -> String {
        self.code.join(SHIM_DIR).to_string_lossy().into_owned()
    }

    /// Re-insert the include/exclude entries no configuration may drop.
    pub fn ensure_forced_paths(&mut self) {
        let shim = self.shim_include();
        push_unique(&mut self.include, &shim);
        for pattern in FORCED_EXCLUDES {
            push_unique(&mut self.exclude, pattern);
        }
    }
}

fn push_unique(list: &mut Vec<String>, entry: &str) {
    if !list.iter().any(|e| e == entry) {
        list.push(entry.to_string());
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// API gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewaySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub description: String,
    pub protocols: Vec<String>,
    /// Release stage, e.g. `release`, `prepub`, `test`.
    pub environment: String,
    pub endpoints: Vec<EndpointSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_domains: Vec<CustomDomain>,
    pub client_remark: String,
    /// Gateway options passed through untouched (usage plans, auth, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GatewaySettings {
    /// `https` when any configured protocol is HTTPS, `http` otherwise.
    pub fn default_scheme(protocols: &[String]) -> &'static str {
        if protocols.iter().any(|p| p.eq_ignore_ascii_case("https")) {
            "https"
        } else {
            "http"
        }
    }
}

/// A single gateway route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub path: String,
    pub method: String,
    pub function: EndpointFunction,
}

/// Function binding of a gateway route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFunction {
    pub function_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_namespace: Option<String>,
    pub is_integrated_response: bool,
}

impl EndpointSpec {
    /// The `/` + `ANY` route that forwards every request to the function.
    pub fn catch_all(function_name: &str, function_namespace: Option<String>) -> Self {
        Self {
            path: "/".to_string(),
            method: "ANY".to_string(),
            function: EndpointFunction {
                function_name: function_name.to_string(),
                function_namespace,
                is_integrated_response: true,
            },
        }
    }
}

/// Custom domain bound to the gateway. Only `domain` is interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomDomain {
    pub domain: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CustomDomain {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            extra: Map::new(),
        }
    }
}

// ── DNS ───────────────────────────────────────────────────────────

/// DNS record type. Gateway subdomains are only ever aliased.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    #[default]
    #[serde(rename = "CNAME")]
    Cname,
}

/// Whether a DNS record is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[default]
    #[serde(rename = "enable", alias = "enabled")]
    Enable,
    #[serde(rename = "disable", alias = "disabled")]
    Disable,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Enable => f.write_str("enable"),
            RecordStatus::Disable => f.write_str("disable"),
        }
    }
}

/// DNS settings as written by the user, globally or per region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsBaseSettings {
    /// Routing line, e.g. `默认`, `电信`, `联通`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    /// MX priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mx: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
}

/// DNS settings synthesized for a single region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDnsSettings {
    pub record_type: RecordType,
    /// `None` means the region gets no record for any custom domain.
    pub record_line: Option<String>,
    pub ttl: Option<u32>,
    pub mx: Option<u32>,
    pub status: RecordStatus,
}

impl RegionDnsSettings {
    pub fn from_base(base: &DnsBaseSettings) -> Self {
        Self {
            record_type: RecordType::Cname,
            record_line: base
                .record_line
                .as_ref()
                .filter(|line| !line.trim().is_empty())
                .cloned(),
            ttl: base.ttl,
            mx: base.mx,
            status: base.status.unwrap_or_default(),
        }
    }
}

// ── Canonical / region configs ────────────────────────────────────

/// Raw override blocks for one region, as found under `regions.<id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Map<String, Value>>,
}

/// Fully-defaulted configuration before region overrides are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalConfig {
    pub project_name: String,
    /// Ordered, never empty.
    pub regions: Vec<String>,
    pub function: FunctionSettings,
    pub gateway: GatewaySettings,
    pub dns: DnsBaseSettings,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<String, RegionOverride>,
}

/// Concrete settings for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub region: String,
    pub function: FunctionSettings,
    pub gateway: GatewaySettings,
    pub dns: RegionDnsSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(code: &str) -> FunctionSettings {
        FunctionSettings {
            name: "fn".to_string(),
            code: PathBuf::from(code),
            handler: "index.main_handler".to_string(),
            runtime: "Python3.6".to_string(),
            include: vec![],
            exclude: vec![".git/**".to_string()],
            timeout: None,
            memory_size: None,
            environment: None,
            vpc: None,
            namespace: None,
            client_remark: "tencent-tornado".to_string(),
        }
    }

    #[test]
    fn forced_paths_are_not_duplicated() {
        let mut f = function("/srv/app");
        f.ensure_forced_paths();
        f.ensure_forced_paths();

        assert_eq!(f.include, vec!["/srv/app/.cache".to_string()]);
        assert_eq!(f.exclude.iter().filter(|e| *e == ".git/**").count(), 1);
        for pattern in FORCED_EXCLUDES {
            assert!(f.exclude.iter().any(|e| e == pattern), "missing {pattern}");
        }
    }

    #[test]
    fn default_scheme_prefers_https() {
        let protocols = vec!["http".to_string(), "HTTPS".to_string()];
        assert_eq!(GatewaySettings::default_scheme(&protocols), "https");
        assert_eq!(GatewaySettings::default_scheme(&["http".to_string()]), "http");
        assert_eq!(GatewaySettings::default_scheme(&[]), "http");
    }

    #[test]
    fn region_dns_defaults() {
        let dns = RegionDnsSettings::from_base(&DnsBaseSettings {
            record_line: Some("  ".to_string()),
            ttl: Some(600),
            ..Default::default()
        });
        assert_eq!(dns.record_type, RecordType::Cname);
        assert_eq!(dns.record_line, None);
        assert_eq!(dns.ttl, Some(600));
        assert_eq!(dns.status, RecordStatus::Enable);
    }

    #[test]
    fn record_status_accepts_both_spellings() {
        let enabled: RecordStatus = serde_json::from_str("\"enabled\"").unwrap();
        let disable: RecordStatus = serde_json::from_str("\"disable\"").unwrap();
        assert_eq!(enabled, RecordStatus::Enable);
        assert_eq!(disable, RecordStatus::Disable);
        assert_eq!(serde_json::to_string(&RecordStatus::Enable).unwrap(), "\"enable\"");
    }

    #[test]
    fn custom_domain_keeps_extra_fields() {
        let domain: CustomDomain = serde_json::from_value(serde_json::json!({
            "domain": "example.com",
            "certificate_id": "cert-1",
        }))
        .unwrap();
        assert_eq!(domain.domain, "example.com");
        assert_eq!(domain.extra.get("certificate_id").unwrap(), "cert-1");
    }
}
