//! In-memory fakes for the host traits (testing only)
//!
//! Provides `MemoryAlertSource`, `MemoryVcsHost`, and `ScriptedResolver`
//! that satisfy the trait contracts without any network or subprocess.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::alert::Alert;
use crate::error::{HostError, HostResult};
use crate::traits::{
    AlertSource, CommitFile, DependencyResolver, NewPullRequest, PullRequestId, ResolverCheck,
    VcsHost,
};

// ---------------------------------------------------------------------------
// MemoryAlertSource
// ---------------------------------------------------------------------------

/// Alert source serving a fixed alert set, optionally failing the fetch.
#[derive(Debug, Default)]
pub struct MemoryAlertSource {
    alerts: Vec<Alert>,
    fail_fetch: bool,
}

impl MemoryAlertSource {
    pub fn new(alerts: Vec<Alert>) -> Self {
        Self {
            alerts,
            fail_fetch: false,
        }
    }

    /// Make `fetch_alerts` fail, for exercising the fatal-fetch path.
    pub fn failing() -> Self {
        Self {
            alerts: Vec::new(),
            fail_fetch: true,
        }
    }
}

#[async_trait]
impl AlertSource for MemoryAlertSource {
    async fn fetch_alerts(&self) -> HostResult<Vec<Alert>> {
        if self.fail_fetch {
            return Err(HostError::Status {
                code: 503,
                body: "alert source unavailable".to_string(),
            });
        }
        Ok(self.alerts.clone())
    }
}

// ---------------------------------------------------------------------------
// MemoryVcsHost
// ---------------------------------------------------------------------------

/// One recorded commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommit {
    pub branch: String,
    pub files: Vec<CommitFile>,
    pub message: String,
}

#[derive(Debug, Default)]
struct VcsState {
    branches: HashSet<String>,
    commits: Vec<RecordedCommit>,
    pull_requests: Vec<NewPullRequest>,
}

/// In-memory VCS host that records every branch, commit, and PR so
/// tests can assert exactly what a run wrote.
#[derive(Debug, Default)]
pub struct MemoryVcsHost {
    state: Mutex<VcsState>,
}

impl MemoryVcsHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed an existing remote branch (idempotency tests).
    pub fn with_branch(self, branch: &str) -> Self {
        self.state.lock().unwrap().branches.insert(branch.to_string());
        self
    }

    pub fn branches(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.state.lock().unwrap().branches.iter().cloned().collect();
        names.sort();
        names
    }

    pub fn commits(&self) -> Vec<RecordedCommit> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn pull_requests(&self) -> Vec<NewPullRequest> {
        self.state.lock().unwrap().pull_requests.clone()
    }
}

#[async_trait]
impl VcsHost for MemoryVcsHost {
    async fn branch_exists(&self, branch: &str) -> HostResult<bool> {
        Ok(self.state.lock().unwrap().branches.contains(branch))
    }

    async fn create_branch(&self, branch: &str, _base: &str) -> HostResult<()> {
        self.state
            .lock()
            .unwrap()
            .branches
            .insert(branch.to_string());
        Ok(())
    }

    async fn commit_files(
        &self,
        branch: &str,
        files: &[CommitFile],
        message: &str,
    ) -> HostResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.branches.contains(branch) {
            return Err(HostError::Status {
                code: 404,
                body: format!("branch not found: {branch}"),
            });
        }
        state.commits.push(RecordedCommit {
            branch: branch.to_string(),
            files: files.to_vec(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> HostResult<PullRequestId> {
        let mut state = self.state.lock().unwrap();
        state.pull_requests.push(pr.clone());
        Ok(PullRequestId(state.pull_requests.len() as u64))
    }
}

// ---------------------------------------------------------------------------
// ScriptedResolver
// ---------------------------------------------------------------------------

/// Resolver whose verdicts are scripted per package substring.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    /// Content substrings that make `check` fail, with diagnostics.
    failures: Vec<(String, String)>,
    /// Lockfile path suffix to report, if any.
    lockfile_suffix: Option<String>,
}

impl ScriptedResolver {
    /// A resolver that passes everything and produces no lockfiles.
    pub fn passing() -> Self {
        Self::default()
    }

    /// Fail any manifest whose content contains `needle`.
    pub fn failing_on(mut self, needle: &str, diagnostics: &str) -> Self {
        self.failures
            .push((needle.to_string(), diagnostics.to_string()));
        self
    }

    /// Report `<manifest>.<suffix>` as the generated lockfile.
    pub fn with_lockfile_suffix(mut self, suffix: &str) -> Self {
        self.lockfile_suffix = Some(suffix.to_string());
        self
    }
}

#[async_trait]
impl DependencyResolver for ScriptedResolver {
    async fn check(&self, _manifest_path: &str, content: &str) -> HostResult<ResolverCheck> {
        for (needle, diagnostics) in &self.failures {
            if content.contains(needle) {
                return Ok(ResolverCheck::fail(diagnostics.clone()));
            }
        }
        Ok(ResolverCheck::pass())
    }

    async fn generate_lockfile(&self, manifest_path: &str) -> HostResult<Option<String>> {
        Ok(self
            .lockfile_suffix
            .as_ref()
            .map(|suffix| format!("{manifest_path}.{suffix}")))
    }
}
