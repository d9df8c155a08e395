//! Aggregated deploy output.
//!
//! A single-region deployment reports a flat object. With two or more
//! regions each region gets its own entry, keyed by region id and emitted in
//! region-list order.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use tornado_core::GatewaySettings;

use crate::collaborator::{GatewayDeployment, RegionOutputs};
use crate::error::{DeployError, DeployResult, Stage};

/// Public address of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionOutput {
    pub api_gateway_service_id: String,
    pub url: String,
}

impl RegionOutput {
    pub fn from_gateway(gateway: &GatewayDeployment) -> Self {
        Self {
            api_gateway_service_id: gateway.service_id.clone(),
            url: gateway_url(gateway),
        }
    }
}

/// `{scheme}://{sub_domain}/{environment}/`
pub fn gateway_url(gateway: &GatewayDeployment) -> String {
    format!(
        "{}://{}/{}/",
        GatewaySettings::default_scheme(&gateway.protocols),
        gateway.sub_domain,
        gateway.environment
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatedOutput {
    Single {
        function_name: String,
        region: String,
        output: RegionOutput,
        dns: Option<String>,
    },
    Multi {
        function_name: String,
        regions: Vec<(String, RegionOutput)>,
        dns: Option<String>,
    },
}

impl AggregatedOutput {
    /// Build the output shape for `regions`, failing if a region has no
    /// gateway output.
    pub fn build(
        function_name: &str,
        regions: &[String],
        gateways: &RegionOutputs<GatewayDeployment>,
        dns: Option<String>,
    ) -> DeployResult<Self> {
        let mut outputs = Vec::with_capacity(regions.len());
        for region in regions {
            let gateway = gateways
                .get(region)
                .ok_or_else(|| DeployError::MissingRegionOutput {
                    stage: Stage::Gateway,
                    region: region.clone(),
                })?;
            outputs.push((region.clone(), RegionOutput::from_gateway(gateway)));
        }

        let function_name = function_name.to_string();
        if outputs.len() == 1 {
            let (region, output) = outputs.remove(0);
            Ok(AggregatedOutput::Single {
                function_name,
                region,
                output,
                dns,
            })
        } else {
            Ok(AggregatedOutput::Multi {
                function_name,
                regions: outputs,
                dns,
            })
        }
    }

    pub fn function_name(&self) -> &str {
        match self {
            AggregatedOutput::Single { function_name, .. }
            | AggregatedOutput::Multi { function_name, .. } => function_name,
        }
    }

    pub fn dns(&self) -> Option<&str> {
        match self {
            AggregatedOutput::Single { dns, .. } | AggregatedOutput::Multi { dns, .. } => {
                dns.as_deref()
            }
        }
    }

    pub fn region(&self, region: &str) -> Option<&RegionOutput> {
        match self {
            AggregatedOutput::Single {
                region: r, output, ..
            } => (r == region).then_some(output),
            AggregatedOutput::Multi { regions, .. } => regions
                .iter()
                .find(|(r, _)| r == region)
                .map(|(_, output)| output),
        }
    }
}

impl Serialize for AggregatedOutput {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self {
            AggregatedOutput::Single {
                function_name,
                region,
                output,
                dns,
            } => {
                map.serialize_entry("functionName", function_name)?;
                map.serialize_entry("region", region)?;
                map.serialize_entry("apiGatewayServiceId", &output.api_gateway_service_id)?;
                map.serialize_entry("url", &output.url)?;
                if let Some(dns) = dns {
                    map.serialize_entry("dns", dns)?;
                }
            }
            AggregatedOutput::Multi {
                function_name,
                regions,
                dns,
            } => {
                map.serialize_entry("functionName", function_name)?;
                for (region, output) in regions {
                    map.serialize_entry(region, output)?;
                }
                if let Some(dns) = dns {
                    map.serialize_entry("dns", dns)?;
                }
            }
        }
        map.end()
    }
}
