//! Runtime shim staging.
//!
//! Before the function is deployed the shim directory is copied into
//! `<code>/.cache` and the project-name token in its entrypoint is replaced,
//! so the packaged function imports the user's Tornado application.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tornado_core::SHIM_DIR;
use tracing::debug;
use walkdir::WalkDir;

use crate::collaborator::FileStager;

/// Token replaced with the project name in the shim entrypoint.
pub const PROJECT_TOKEN: &str = "{{tornado_project}}";

/// Entrypoint file of the shim.
pub const SHIM_ENTRYPOINT: &str = "index.py";

const EMBEDDED_ENTRYPOINT: &str = include_str!("../shim/index.py");

/// Where the shim comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShimSource {
    /// The entrypoint compiled into this crate.
    Embedded,
    /// A directory tree on disk, copied as-is.
    Dir(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ShimStager {
    source: ShimSource,
}

impl ShimStager {
    pub fn embedded() -> Self {
        Self {
            source: ShimSource::Embedded,
        }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: ShimSource::Dir(dir.into()),
        }
    }

    /// Copy the shim into `<code_uri>/.cache` and substitute the project
    /// token. Existing files are overwritten.
    pub fn stage_blocking(&self, code_uri: &Path, project_name: &str) -> Result<PathBuf> {
        let dst = code_uri.join(SHIM_DIR);
        fs::create_dir_all(&dst)
            .with_context(|| format!("failed to create {}", dst.display()))?;

        match &self.source {
            ShimSource::Embedded => {
                fs::write(dst.join(SHIM_ENTRYPOINT), EMBEDDED_ENTRYPOINT)
                    .with_context(|| format!("failed to write shim into {}", dst.display()))?;
            }
            ShimSource::Dir(src) => copy_tree(src, &dst)?,
        }

        let entrypoint = dst.join(SHIM_ENTRYPOINT);
        let content = fs::read_to_string(&entrypoint)
            .with_context(|| format!("shim entrypoint missing at {}", entrypoint.display()))?;
        fs::write(&entrypoint, content.replace(PROJECT_TOKEN, project_name))
            .with_context(|| format!("failed to write {}", entrypoint.display()))?;

        debug!(project = %project_name, dst = %dst.display(), "shim staged");
        Ok(dst)
    }
}

impl Default for ShimStager {
    fn default() -> Self {
        Self::embedded()
    }
}

#[async_trait]
impl FileStager for ShimStager {
    async fn stage(&self, code_uri: &Path, project_name: &str) -> Result<()> {
        let stager = self.clone();
        let code_uri = code_uri.to_path_buf();
        let project_name = project_name.to_string();
        tokio::task::spawn_blocking(move || stager.stage_blocking(&code_uri, &project_name))
            .await
            .context("shim staging task panicked")??;
        Ok(())
    }
}

fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| format!("{} escapes {}", entry.path().display(), src.display()))?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embedded_shim_gets_project_name() {
        let code = tempfile::tempdir().unwrap();
        ShimStager::embedded()
            .stage(code.path(), "blog")
            .await
            .unwrap();

        let staged = fs::read_to_string(code.path().join(".cache/index.py")).unwrap();
        assert!(staged.contains("import_module(\"blog\")"));
        assert!(!staged.contains(PROJECT_TOKEN));
    }

    #[test]
    fn directory_shim_is_copied_recursively() {
        let shim = tempfile::tempdir().unwrap();
        fs::write(
            shim.path().join("index.py"),
            "PROJECT = '{{tornado_project}}'\nOTHER = '{{tornado_project}}'\n",
        )
        .unwrap();
        fs::create_dir(shim.path().join("lib")).unwrap();
        fs::write(shim.path().join("lib/helper.py"), "X = 1\n").unwrap();

        let code = tempfile::tempdir().unwrap();
        let dst = ShimStager::from_dir(shim.path())
            .stage_blocking(code.path(), "demo")
            .unwrap();

        assert_eq!(dst, code.path().join(".cache"));
        assert_eq!(
            fs::read_to_string(dst.join("index.py")).unwrap(),
            "PROJECT = 'demo'\nOTHER = 'demo'\n"
        );
        assert_eq!(fs::read_to_string(dst.join("lib/helper.py")).unwrap(), "X = 1\n");
    }

    #[test]
    fn restaging_overwrites_previous_project() {
        let code = tempfile::tempdir().unwrap();
        let stager = ShimStager::embedded();
        stager.stage_blocking(code.path(), "first").unwrap();
        stager.stage_blocking(code.path(), "second").unwrap();

        let staged = fs::read_to_string(code.path().join(".cache/index.py")).unwrap();
        assert!(staged.contains("\"second\""));
        assert!(!staged.contains("\"first\""));
    }

    #[test]
    fn missing_entrypoint_is_reported() {
        let shim = tempfile::tempdir().unwrap();
        let code = tempfile::tempdir().unwrap();
        let err = ShimStager::from_dir(shim.path())
            .stage_blocking(code.path(), "demo")
            .unwrap_err();
        assert!(err.to_string().contains("shim entrypoint missing"));
    }
}
