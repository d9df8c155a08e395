//! `tornado remove`: tear down from persisted state.

use anyhow::Result;
use serde_json::{Value, json};
use tracing::warn;

use crate::DataArgs;

pub async fn remove(project: &str, data: &DataArgs) -> Result<Value> {
    let orchestrator = super::sandbox_orchestrator(data, None)?;
    let removed = orchestrator.remove(project).await?;
    if !removed {
        warn!(%project, "no deployment recorded for project");
    }
    Ok(json!({ "project": project, "removed": removed }))
}
