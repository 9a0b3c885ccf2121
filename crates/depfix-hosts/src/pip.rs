//! Dependency resolver backed by pip.
//!
//! The consistency check runs `pip install --dry-run` against a
//! temporary copy of the proposed manifest, so a rejected change never
//! touches the working tree. Lockfile generation shells out to
//! `pip-compile` when it is installed and is skipped silently when not.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HostError, HostResult};
use crate::traits::{DependencyResolver, ResolverCheck};

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct PipResolverConfig {
    /// Repository root; lockfiles are generated relative to it.
    pub repo_root: PathBuf,
    /// Python interpreter used to invoke pip.
    pub python: String,
    /// Timeout per resolver invocation, in seconds.
    pub timeout_secs: u64,
}

impl PipResolverConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            python: "python3".to_string(),
            timeout_secs: 300,
        }
    }
}

/// pip-based implementation of [`DependencyResolver`].
pub struct PipResolver {
    config: PipResolverConfig,
}

impl PipResolver {
    pub fn new(config: PipResolverConfig) -> Self {
        Self { config }
    }

    async fn run(&self, program: &str, args: &[&str], cwd: &Path) -> HostResult<std::process::Output> {
        // Timing out drops the wait future; kill_on_drop stops the
        // resolver process from outliving it.
        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| HostError::Timeout(self.config.timeout_secs))?
        .map_err(HostError::Io)
    }

    async fn pip_compile_available(&self) -> bool {
        Command::new("pip-compile")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DependencyResolver for PipResolver {
    async fn check(&self, manifest_path: &str, content: &str) -> HostResult<ResolverCheck> {
        // Dry-run against a scratch copy; the working tree stays clean.
        let scratch = tempfile::tempdir()?;
        let file_name = Path::new(manifest_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "requirements.txt".to_string());
        let scratch_manifest = scratch.path().join(file_name);
        tokio::fs::write(&scratch_manifest, content).await?;

        let manifest_arg = scratch_manifest.to_string_lossy().to_string();
        let output = self
            .run(
                &self.config.python,
                &[
                    "-m",
                    "pip",
                    "install",
                    "--dry-run",
                    "--quiet",
                    "--disable-pip-version-check",
                    "-r",
                    &manifest_arg,
                ],
                scratch.path(),
            )
            .await?;

        if output.status.success() {
            debug!(manifest = %manifest_path, "resolver check passed");
            Ok(ResolverCheck::pass())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!(manifest = %manifest_path, "resolver check failed");
            Ok(ResolverCheck::fail(stderr))
        }
    }

    async fn generate_lockfile(&self, manifest_path: &str) -> HostResult<Option<String>> {
        if !self.pip_compile_available().await {
            warn!("pip-compile not installed; skipping lockfile generation");
            return Ok(None);
        }

        let lock_path = format!(
            "{}.lock",
            manifest_path.trim_end_matches(".txt").trim_end_matches(".toml")
        );
        let output = self
            .run(
                "pip-compile",
                &["--quiet", "--output-file", &lock_path, manifest_path],
                &self.config.repo_root,
            )
            .await?;

        if output.status.success() {
            Ok(Some(lock_path))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(HostError::CommandFailed {
                tool: "pip-compile".to_string(),
                stderr,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = PipResolverConfig::new("/tmp/repo");
        assert_eq!(config.python, "python3");
        assert_eq!(config.timeout_secs, 300);
    }

    #[tokio::test]
    async fn overrunning_command_times_out() {
        let mut config = PipResolverConfig::new(".");
        config.timeout_secs = 1;
        let resolver = PipResolver::new(config);

        let err = resolver
            .run("sleep", &["30"], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::Timeout(1)));
    }

    #[tokio::test]
    async fn pip_compile_probe_does_not_panic() {
        let resolver = PipResolver::new(PipResolverConfig::new("."));
        // Whichever way the probe resolves on this machine, it must not error.
        let _ = resolver.pip_compile_available().await;
    }
}
