//! Input document parser.
//!
//! The document is kept as a dynamically-shaped tree so that region override
//! blocks can be merged structurally later on. Typed views over the known
//! top-level fields are deserialized on demand.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::merge::value_kind;
use crate::types::{CustomDomain, DnsBaseSettings, RegionOverride};

/// Top-level key holding per-region override blocks.
pub const REGIONS_KEY: &str = "regions";

/// A declarative input document (`tornado.toml` or `tornado.json`).
#[derive(Debug, Clone, PartialEq)]
pub struct InputDocument {
    root: Map<String, Value>,
}

/// Either a single value or a list of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// Typed view over the top-level fields of an input document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputFields {
    pub project_name: Option<String>,
    pub function_name: Option<String>,
    /// Legacy code location; `function.code` wins.
    pub code: Option<String>,
    pub region: Option<OneOrMany>,
    pub handler: Option<String>,
    pub runtime: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub client_remark: Option<String>,
    pub service_name: Option<String>,
    pub service_id: Option<String>,
    pub function: Option<FunctionInput>,
    pub gateway: Option<GatewayInput>,
    pub dns: Option<DnsBaseSettings>,
}

/// The `[function]` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionInput {
    pub code: Option<String>,
    pub handler: Option<String>,
    pub runtime: Option<String>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub timeout: Option<u32>,
    pub memory_size: Option<u32>,
    pub environment: Option<Value>,
    pub vpc: Option<Value>,
    pub namespace: Option<String>,
}

/// The `[gateway]` block. Unknown keys are passed through to the gateway.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayInput {
    pub protocols: Option<Vec<String>>,
    pub environment: Option<String>,
    pub custom_domains: Option<Vec<CustomDomain>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InputDocument {
    /// Wrap an already-parsed tree. The root must be a table.
    pub fn from_value(value: Value) -> ConfigResult<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::Malformed {
                field: "<root>".to_string(),
                reason: format!("expected a table, found {}", value_kind(&other)),
            }),
        }
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let value: Value = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_value(value)
    }

    /// Load a document, choosing the format by extension (TOML unless `.json`).
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// The one unconditionally required field.
    pub fn project_name(&self) -> ConfigResult<&str> {
        match self.root.get("project_name") {
            Some(Value::String(name)) if !name.trim().is_empty() => Ok(name.as_str()),
            None | Some(Value::Null) | Some(Value::String(_)) => Err(ConfigError::MissingProjectName),
            Some(other) => Err(ConfigError::Malformed {
                field: "project_name".to_string(),
                reason: format!("expected a string, found {}", value_kind(other)),
            }),
        }
    }

    /// Deserialize the known top-level fields.
    pub fn fields(&self) -> ConfigResult<InputFields> {
        InputFields::deserialize(Value::Object(self.root.clone())).map_err(|e| {
            ConfigError::Malformed {
                field: "<root>".to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Collect the `regions.<id>.{function,gateway,dns}` override blocks.
    pub fn region_overrides(&self) -> ConfigResult<BTreeMap<String, RegionOverride>> {
        let Some(regions) = self.root.get(REGIONS_KEY) else {
            return Ok(BTreeMap::new());
        };
        let Value::Object(regions) = regions else {
            return Err(ConfigError::Malformed {
                field: REGIONS_KEY.to_string(),
                reason: format!("expected a table, found {}", value_kind(regions)),
            });
        };

        let mut overrides = BTreeMap::new();
        for (region, block) in regions {
            let Value::Object(block) = block else {
                return Err(region_error(
                    region,
                    format!("expected a table, found {}", value_kind(block)),
                ));
            };

            let mut entry = RegionOverride::default();
            for (key, value) in block {
                let slot = match key.as_str() {
                    "function" => &mut entry.function,
                    "gateway" => &mut entry.gateway,
                    "dns" => &mut entry.dns,
                    other => {
                        return Err(region_error(region, format!("unknown block `{other}`")));
                    }
                };
                match value {
                    Value::Object(map) => *slot = Some(map.clone()),
                    other => {
                        return Err(region_error(
                            region,
                            format!("`{key}` must be a table, found {}", value_kind(other)),
                        ));
                    }
                }
            }
            overrides.insert(region.clone(), entry);
        }
        Ok(overrides)
    }
}

fn region_error(region: &str, reason: String) -> ConfigError {
    ConfigError::RegionOverride {
        region: region.to_string(),
        reason,
    }
}
