//! `tornado state`: print persisted deployment state.

use anyhow::{Result, bail};
use serde_json::Value;

use crate::DataArgs;

pub fn state(project: Option<&str>, data: &DataArgs) -> Result<Value> {
    let store = super::open_store(data)?;
    match project {
        Some(project) => match store.get_deployment(project)? {
            Some(state) => Ok(serde_json::to_value(state)?),
            None => bail!("no deployment recorded for project `{project}`"),
        },
        None => Ok(serde_json::to_value(store.list_deployments()?)?),
    }
}
