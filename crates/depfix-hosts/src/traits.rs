//! Trait seams for the external collaborators of the remediation run.
//!
//! These traits define the three outward-facing surfaces:
//! - `AlertSource`: fetch the active alert set from the scanner
//! - `VcsHost`: branch/commit/pull-request operations, plus the
//!   branch-existence query the idempotency check relies on
//! - `DependencyResolver`: manifest consistency check and lockfile
//!   generation
//!
//! All traits are async and backend-agnostic. In-memory fakes are
//! provided for testing via the `fakes` module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alert::Alert;
use crate::error::HostResult;

// ---------------------------------------------------------------------------
// AlertSource
// ---------------------------------------------------------------------------

/// Source of vulnerability alerts (the external scanner).
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Fetch the current alert set. Called once per run; a failure here
    /// aborts the run before any alert is processed.
    async fn fetch_alerts(&self) -> HostResult<Vec<Alert>>;

    /// Fetch the detailed record for one alert. Sources whose list
    /// endpoint already returns full records may return the alert
    /// unchanged.
    async fn fetch_alert_detail(&self, alert: &Alert) -> HostResult<Alert> {
        Ok(alert.clone())
    }
}

// ---------------------------------------------------------------------------
// VcsHost
// ---------------------------------------------------------------------------

/// One file write to be committed onto a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    /// Repository-relative path.
    pub path: String,
    /// Full new file content.
    pub content: String,
}

/// A pull request to be opened after the branch is pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// Identifier of a created pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestId(pub u64);

impl std::fmt::Display for PullRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Version-control/PR host operations.
///
/// Guarantees callers rely on:
/// - `branch_exists` reflects branches created earlier in the same run.
/// - `commit_files` writes only the listed files onto the branch.
#[async_trait]
pub trait VcsHost: Send + Sync {
    /// Whether a branch with this name already exists on the remote.
    async fn branch_exists(&self, branch: &str) -> HostResult<bool>;

    /// Create a branch from the tip of `base`.
    async fn create_branch(&self, branch: &str, base: &str) -> HostResult<()>;

    /// Commit file writes to an existing branch.
    async fn commit_files(
        &self,
        branch: &str,
        files: &[CommitFile],
        message: &str,
    ) -> HostResult<()>;

    /// Open a pull request and return its id.
    async fn open_pull_request(&self, pr: &NewPullRequest) -> HostResult<PullRequestId>;
}

// ---------------------------------------------------------------------------
// DependencyResolver
// ---------------------------------------------------------------------------

/// Outcome of a manifest consistency check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverCheck {
    pub ok: bool,
    /// Diagnostic text from the resolver; empty on a clean pass.
    pub diagnostics: String,
}

impl ResolverCheck {
    pub fn pass() -> Self {
        Self {
            ok: true,
            diagnostics: String::new(),
        }
    }

    pub fn fail(diagnostics: impl Into<String>) -> Self {
        Self {
            ok: false,
            diagnostics: diagnostics.into(),
        }
    }
}

/// External dependency-resolution check and lockfile generation.
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// Check that the proposed manifest content resolves cleanly.
    /// `manifest_path` is the repository-relative path, used to pick
    /// the dialect-appropriate check.
    async fn check(&self, manifest_path: &str, content: &str) -> HostResult<ResolverCheck>;

    /// Regenerate the lockfile for a manifest. Returns the
    /// repository-relative lockfile path, or `None` when the dialect
    /// has no lockfile or the generator is unavailable.
    async fn generate_lockfile(&self, manifest_path: &str) -> HostResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_check_constructors() {
        assert!(ResolverCheck::pass().ok);
        let fail = ResolverCheck::fail("conflict: urllib3");
        assert!(!fail.ok);
        assert!(fail.diagnostics.contains("urllib3"));
    }

    #[test]
    fn pull_request_id_display() {
        assert_eq!(PullRequestId(42).to_string(), "42");
    }
}
