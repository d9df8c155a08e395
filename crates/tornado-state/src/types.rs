//! Persisted deployment state.
//!
//! A [`DeploymentState`] records exactly the resource references teardown
//! needs. It is written once per successful deploy and is never recomputed
//! from input during removal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Project name, used as the table key.
pub type ProjectName = String;

/// Deployed function: one name across regions, one cloud id per region.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FunctionResourceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Region → function id.
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

/// Gateway service deployed in one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayRegionRef {
    pub service_id: String,
    pub sub_domain: String,
    pub environment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayResourceRef {
    /// Region → gateway service.
    #[serde(default)]
    pub regions: BTreeMap<String, GatewayRegionRef>,
}

/// Everything needed to tear a deployment down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentState {
    pub project: ProjectName,
    /// Regions in deploy order.
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub client_remark: String,
    pub function: FunctionResourceRef,
    pub gateway: GatewayResourceRef,
    /// Custom domains a DNS deployment was made for.
    #[serde(default)]
    pub dns_domains: Vec<String>,
    /// Identifier of the last DNS deployment, if the provider returned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_id: Option<String>,
    /// Unix timestamp (seconds).
    pub created_at: u64,
    pub updated_at: u64,
}

impl DeploymentState {
    pub fn table_key(&self) -> &str {
        &self.project
    }

    /// Carry `created_at` over from an earlier record of the same project.
    pub fn inherit_created_at(&mut self, previous: Option<&DeploymentState>) {
        if let Some(prev) = previous {
            self.created_at = prev.created_at.min(self.created_at);
        }
    }
}
