//! Subcommand implementations. Each returns a serializable result; `main`
//! prints it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tornado_core::InputDocument;
use tornado_deploy::{FileStager, Orchestrator, SandboxCloud, ShimStager};
use tornado_state::StateStore;
use tracing::debug;

use crate::{DataArgs, InputArgs};

pub mod deploy;
pub mod plan;
pub mod remove;
pub mod state;

/// State database file inside the data directory.
pub const STATE_DB_FILE: &str = "tornado.redb";

pub fn open_store(data: &DataArgs) -> Result<StateStore> {
    std::fs::create_dir_all(&data.data_dir)
        .with_context(|| format!("failed to create {}", data.data_dir.display()))?;
    let path = data.data_dir.join(STATE_DB_FILE);
    let store = StateStore::open(&path)
        .with_context(|| format!("failed to open state store at {}", path.display()))?;
    Ok(store)
}

/// Orchestrator wired to a fresh sandbox cloud.
pub fn sandbox_orchestrator(data: &DataArgs, shim_dir: Option<&Path>) -> Result<Orchestrator> {
    let stager: Arc<dyn FileStager> = match shim_dir {
        Some(dir) => Arc::new(ShimStager::from_dir(dir)),
        None => Arc::new(ShimStager::embedded()),
    };
    let cloud = SandboxCloud::new();
    Ok(Orchestrator::new(cloud.collaborators(stager), open_store(data)?))
}

pub fn load_input(input: &InputArgs) -> Result<InputDocument> {
    let doc = InputDocument::from_file(&input.file)
        .with_context(|| format!("failed to load {}", input.file.display()))?;
    debug!(file = %input.file.display(), "input document loaded");
    Ok(doc)
}

pub fn rng(input: &InputArgs) -> StdRng {
    match input.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Working directory the code location defaults to.
pub fn working_dir() -> Result<std::path::PathBuf> {
    std::env::current_dir().context("failed to read the current directory")
}
