//! `tornado deploy`: deploy against the sandbox cloud.

use std::path::Path;

use anyhow::Result;
use tornado_deploy::AggregatedOutput;
use tracing::info;

use crate::{DataArgs, InputArgs};

pub async fn deploy(
    input: &InputArgs,
    data: &DataArgs,
    shim_dir: Option<&Path>,
) -> Result<AggregatedOutput> {
    let orchestrator = super::sandbox_orchestrator(data, shim_dir)?;
    let doc = super::load_input(input)?;
    let output = orchestrator
        .deploy_input(&doc, &super::working_dir()?, &mut super::rng(input))
        .await?;
    info!(function = %output.function_name(), "deploy finished");
    Ok(output)
}
