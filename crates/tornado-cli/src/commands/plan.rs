//! `tornado plan`: normalize and resolve regions without deploying.

use anyhow::Result;
use tornado_deploy::DeployPlan;

use crate::{DataArgs, InputArgs};

pub fn plan(input: &InputArgs, data: &DataArgs) -> Result<DeployPlan> {
    let orchestrator = super::sandbox_orchestrator(data, None)?;
    let doc = super::load_input(input)?;
    let plan = orchestrator.plan_input(&doc, &super::working_dir()?, &mut super::rng(input))?;
    Ok(plan)
}
