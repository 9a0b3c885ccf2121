//! The remediation run: fetch, filter, and drive each alert through
//! `Extracting → Locating → Updating → Validating → Committing`.
//!
//! Processing is deliberately sequential. Each alert's idempotency
//! check depends on branches the previous alert may have created, and
//! the PR budget must observe prior commits before admitting the next
//! alert, so there is nothing to parallelize without making
//! check-then-commit a critical section.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use depfix_hosts::{AlertSource, CommitFile, DependencyResolver, NewPullRequest, VcsHost};
use tracing::warn;

use crate::domain::{
    Alert, AlertKind, AlertState, ChangeSet, DepfixError, FileEdit, PackageFact, Result, Severity,
};
use crate::extract::{extract_package_fact, ManifestSnapshot};
use crate::manifest::{apply_fix, locate_manifests, DiscoveredManifest};
use crate::obs;
use crate::report::{AlertOutcome, AlertRecord, RunReporter, RunStatus, RunSummary, SkipReason};
use crate::validate::{validate_edits, ValidationOutcome};

/// Constant prefix for remediation branches.
pub const BRANCH_PREFIX: &str = "security/dependency-update";

/// Hard per-run safety limits. Read-only once a run starts.
#[derive(Debug, Clone)]
pub struct RunLimits {
    pub max_prs: u32,
    pub max_files_per_pr: usize,
    pub max_lines_per_file: usize,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_prs: 10,
            max_files_per_pr: 10,
            max_lines_per_file: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub repo_root: PathBuf,
    pub base_branch: String,
    /// Inclusive severity floor for candidate alerts.
    pub severity_floor: Severity,
    pub dry_run: bool,
    pub limits: RunLimits,
}

impl RunConfig {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            base_branch: "main".to_string(),
            severity_floor: Severity::High,
            dry_run: false,
            limits: RunLimits::default(),
        }
    }
}

/// Deterministic branch name for one package/version remediation.
/// Repeated runs against an unchanged alert set land on the same name,
/// which is what makes the branch-exists check an idempotency guard.
pub fn branch_name(package: &str, fixed_version: &str) -> String {
    format!("{BRANCH_PREFIX}/{package}-{fixed_version}")
}

pub struct RemediationOrchestrator<'a> {
    alerts: &'a dyn AlertSource,
    vcs: &'a dyn VcsHost,
    resolver: &'a dyn DependencyResolver,
    config: RunConfig,
}

impl<'a> RemediationOrchestrator<'a> {
    pub fn new(
        alerts: &'a dyn AlertSource,
        vcs: &'a dyn VcsHost,
        resolver: &'a dyn DependencyResolver,
        config: RunConfig,
    ) -> Self {
        Self {
            alerts,
            vcs,
            resolver,
            config,
        }
    }

    /// Execute one full run. Errors only when the alert fetch itself
    /// fails; every per-alert problem becomes a recorded skip.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut reporter = RunReporter::new(self.config.dry_run);
        let _span = obs::RunSpan::enter(&reporter.run_id().to_string());
        let started = Instant::now();
        obs::emit_run_started(
            self.config.severity_floor.as_str(),
            self.config.limits.max_prs,
            self.config.dry_run,
        );

        let alerts = self
            .alerts
            .fetch_alerts()
            .await
            .map_err(|err| DepfixError::FetchFailed(err.to_string()))?;
        reporter.alerts_found(alerts.len() as u64);

        let mut eligible = Vec::new();
        for alert in alerts {
            match prefilter_reason(&alert, self.config.severity_floor) {
                Some(reason) => {
                    obs::emit_alert_filtered(alert.id, reason);
                    reporter.record(skip_record(&alert, None, reason, None));
                }
                None => eligible.push(alert),
            }
        }
        // Spend the PR budget on the most severe alerts first; id order
        // breaks ties so reruns are deterministic.
        eligible.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        reporter.alerts_matching_filter(eligible.len() as u64);

        let manifests = self.load_manifests();
        let snapshots: Vec<ManifestSnapshot> = manifests
            .iter()
            .map(|(m, content)| ManifestSnapshot {
                path: m.path.to_string_lossy().to_string(),
                content: content.clone(),
            })
            .collect();

        let mut budget_used: u32 = 0;
        let alerts_processed = eligible.len() as u64;
        for alert in eligible {
            let record = if budget_used >= self.config.limits.max_prs {
                // Budget exhausted: no further external calls at all.
                skip_record(&alert, None, SkipReason::RunLimitReached, None)
            } else {
                self.process_alert(&alert, &manifests, &snapshots, &mut budget_used)
                    .await
            };
            obs::emit_alert_outcome(record.alert_id, &record.outcome);
            reporter.record(record);
        }

        obs::emit_run_finished(
            started.elapsed().as_millis() as u64,
            alerts_processed,
            reporter.prs_created(),
        );
        Ok(reporter.finish(RunStatus::Completed))
    }

    /// Drive one alert to its terminal outcome.
    async fn process_alert(
        &self,
        alert: &Alert,
        manifests: &[(DiscoveredManifest, String)],
        snapshots: &[ManifestSnapshot],
        budget_used: &mut u32,
    ) -> AlertRecord {
        // Extracting
        let detail = match self.alerts.fetch_alert_detail(alert).await {
            Ok(detail) => detail,
            Err(err) => {
                return skip_record(
                    alert,
                    None,
                    SkipReason::ExtractionFailed,
                    Some(format!("detail fetch failed: {err}")),
                );
            }
        };
        let fact = match extract_package_fact(&detail, snapshots) {
            Some(fact) => fact,
            None => return skip_record(alert, None, SkipReason::ExtractionFailed, None),
        };
        if !fact.is_actionable() {
            return skip_record(alert, Some(&fact), SkipReason::NoFixedVersion, None);
        }
        let package = fact.name.value.clone();
        let fixed_version = match &fact.fixed_version {
            Some(fixed) => fixed.value.clone(),
            None => return skip_record(alert, Some(&fact), SkipReason::NoFixedVersion, None),
        };

        // Locating
        if manifests.is_empty() {
            return skip_record(alert, Some(&fact), SkipReason::NoManifestFound, None);
        }

        // Updating
        let edits: Vec<FileEdit> = manifests
            .iter()
            .filter_map(|(m, content)| {
                apply_fix(&m.path, m.dialect, content, &package, &fixed_version)
            })
            .collect();
        if edits.is_empty() {
            return skip_record(alert, Some(&fact), SkipReason::PackageNotInAnyManifest, None);
        }
        if edits.len() > self.config.limits.max_files_per_pr {
            return skip_record(
                alert,
                Some(&fact),
                SkipReason::RunLimitReached,
                Some(format!(
                    "{} files exceeds max-files-per-pr {}",
                    edits.len(),
                    self.config.limits.max_files_per_pr
                )),
            );
        }
        let mut change_set = ChangeSet::new(alert.id, branch_name(&package, &fixed_version));
        change_set.edits = edits;
        if change_set.max_changed_lines() > self.config.limits.max_lines_per_file {
            return skip_record(
                alert,
                Some(&fact),
                SkipReason::RunLimitReached,
                Some(format!(
                    "{} changed lines exceeds max-lines-per-file {}",
                    change_set.max_changed_lines(),
                    self.config.limits.max_lines_per_file
                )),
            );
        }

        // Idempotency guard before any validation or write.
        match self.vcs.branch_exists(&change_set.branch).await {
            Ok(true) => {
                return skip_record(alert, Some(&fact), SkipReason::BranchAlreadyExists, None)
            }
            Ok(false) => {}
            Err(err) => {
                return skip_record(
                    alert,
                    Some(&fact),
                    SkipReason::HostWriteFailed,
                    Some(format!("branch lookup failed: {err}")),
                );
            }
        }

        // Validating
        match validate_edits(self.resolver, &change_set.edits).await {
            ValidationOutcome::Accepted { lockfiles } => change_set.lockfiles = lockfiles,
            ValidationOutcome::Rejected { diagnostics } => {
                return skip_record(
                    alert,
                    Some(&fact),
                    SkipReason::ValidationFailed,
                    Some(diagnostics),
                );
            }
        }

        // Committing
        if self.config.dry_run {
            *budget_used += 1;
            return outcome_record(
                alert,
                Some(&fact),
                AlertOutcome::DryRunWouldCreate {
                    branch: change_set.branch,
                },
                None,
            );
        }
        match self.commit_and_open_pr(alert, &fact, &change_set).await {
            Ok(pr_id) => {
                *budget_used += 1;
                outcome_record(
                    alert,
                    Some(&fact),
                    AlertOutcome::PrCreated {
                        pr_id,
                        branch: change_set.branch,
                    },
                    None,
                )
            }
            Err(err) => skip_record(
                alert,
                Some(&fact),
                SkipReason::HostWriteFailed,
                Some(err.to_string()),
            ),
        }
    }

    async fn commit_and_open_pr(
        &self,
        alert: &Alert,
        fact: &PackageFact,
        change_set: &ChangeSet,
    ) -> std::result::Result<u64, depfix_hosts::HostError> {
        self.vcs
            .create_branch(&change_set.branch, &self.config.base_branch)
            .await?;

        let files: Vec<CommitFile> = change_set
            .edits
            .iter()
            .map(|edit| CommitFile {
                path: edit.target.path.to_string_lossy().to_string(),
                content: edit.new_content.clone(),
            })
            .collect();
        self.vcs
            .commit_files(&change_set.branch, &files, &commit_message(alert, fact, change_set))
            .await?;

        let pr = self.vcs
            .open_pull_request(&pull_request(alert, fact, change_set, &self.config.base_branch))
            .await?;
        Ok(pr.0)
    }

    /// Discover manifests once per run and read their contents. An
    /// unreadable manifest is logged and dropped rather than aborting
    /// the run.
    fn load_manifests(&self) -> Vec<(DiscoveredManifest, String)> {
        let mut loaded = Vec::new();
        for manifest in locate_manifests(&self.config.repo_root) {
            match fs::read_to_string(self.config.repo_root.join(&manifest.path)) {
                Ok(content) => loaded.push((manifest, content)),
                Err(err) => {
                    warn!(event = "manifest.unreadable", path = %manifest.path.display(), error = %err);
                }
            }
        }
        loaded
    }
}

fn prefilter_reason(alert: &Alert, floor: Severity) -> Option<SkipReason> {
    if alert.kind != AlertKind::Dependency {
        return Some(SkipReason::NotDependencyKind);
    }
    if alert.state != AlertState::Active {
        return Some(SkipReason::NotActive);
    }
    if alert.severity < floor {
        return Some(SkipReason::BelowSeverityFilter);
    }
    None
}

fn skip_record(
    alert: &Alert,
    fact: Option<&PackageFact>,
    reason: SkipReason,
    diagnostics: Option<String>,
) -> AlertRecord {
    outcome_record(alert, fact, AlertOutcome::Skipped { reason }, diagnostics)
}

fn outcome_record(
    alert: &Alert,
    fact: Option<&PackageFact>,
    outcome: AlertOutcome,
    diagnostics: Option<String>,
) -> AlertRecord {
    AlertRecord {
        alert_id: alert.id,
        severity: alert.severity,
        title: alert.title.clone(),
        package: fact.map(|f| f.name.value.clone()),
        fixed_version: fact.and_then(|f| f.fixed_version.as_ref().map(|v| v.value.clone())),
        outcome,
        diagnostics,
    }
}

fn commit_message(alert: &Alert, fact: &PackageFact, change_set: &ChangeSet) -> String {
    let fixed = fact
        .fixed_version
        .as_ref()
        .map(|v| v.value.as_str())
        .unwrap_or_default();
    let mut message = format!(
        "fix(deps): update {} to {}\n\nResolves security vulnerability (Alert #{})\nSeverity: {}\n",
        fact.name.value, fixed, alert.id, alert.severity
    );
    if let Some(cve) = &fact.cve {
        message.push_str(&format!("CVE: {}\n", cve.value));
    }
    message.push_str("\nUpdated files:\n");
    for edit in &change_set.edits {
        message.push_str(&format!("- {}\n", edit.target.path.display()));
    }
    message
}

fn pull_request(
    alert: &Alert,
    fact: &PackageFact,
    change_set: &ChangeSet,
    base_branch: &str,
) -> NewPullRequest {
    let package = &fact.name.value;
    let fixed = fact
        .fixed_version
        .as_ref()
        .map(|v| v.value.as_str())
        .unwrap_or_default();
    let current = fact
        .current_version
        .as_ref()
        .map(|v| v.value.as_str())
        .unwrap_or("unknown");

    let mut description = format!(
        "## Security: Update {package}\n\n\
         **Alert ID:** #{}\n**Severity:** {}\n",
        alert.id,
        alert.severity.as_str().to_uppercase()
    );
    if let Some(cve) = &fact.cve {
        description.push_str(&format!("**CVE:** {}\n", cve.value));
    }
    description.push_str(&format!(
        "\n### Vulnerability Details\n{}\n\n### Changes\n\
         - **Package:** `{package}`\n\
         - **Current Version:** `{current}`\n\
         - **Fixed Version:** `{fixed}`\n\n### Files Updated\n",
        alert.description
    ));
    for edit in &change_set.edits {
        description.push_str(&format!("- `{}`\n", edit.target.path.display()));
    }
    for lockfile in &change_set.lockfiles {
        description.push_str(&format!("- `{}` (regenerated)\n", lockfile.display()));
    }
    description.push_str(
        "\n---\n*This PR was automatically generated by the dependency remediation pipeline*\n",
    );

    NewPullRequest {
        source_branch: change_set.branch.clone(),
        target_branch: base_branch.to_string(),
        title: format!("[Security] Update {package} to {fixed}"),
        description,
        labels: vec![
            "security".to_string(),
            "dependencies".to_string(),
            format!("severity-{}", alert.severity.as_str()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(id: u64, kind: AlertKind, state: AlertState, severity: Severity) -> Alert {
        Alert {
            id,
            kind,
            severity,
            state,
            title: format!("alert {id}"),
            description: String::new(),
            code_snippet: None,
            recommendations: vec![],
        }
    }

    #[test]
    fn branch_name_is_deterministic() {
        assert_eq!(
            branch_name("requests", "2.31.0"),
            "security/dependency-update/requests-2.31.0"
        );
    }

    #[test]
    fn prefilter_classifies_in_order() {
        let a = alert(1, AlertKind::Code, AlertState::Dismissed, Severity::Low);
        assert_eq!(
            prefilter_reason(&a, Severity::High),
            Some(SkipReason::NotDependencyKind)
        );

        let a = alert(2, AlertKind::Dependency, AlertState::Dismissed, Severity::Critical);
        assert_eq!(prefilter_reason(&a, Severity::High), Some(SkipReason::NotActive));

        let a = alert(3, AlertKind::Dependency, AlertState::Active, Severity::Medium);
        assert_eq!(
            prefilter_reason(&a, Severity::High),
            Some(SkipReason::BelowSeverityFilter)
        );

        let a = alert(4, AlertKind::Dependency, AlertState::Active, Severity::High);
        assert_eq!(prefilter_reason(&a, Severity::High), None);
    }

    #[test]
    fn eligible_sort_is_severity_desc_then_id_asc() {
        let mut alerts = vec![
            alert(9, AlertKind::Dependency, AlertState::Active, Severity::High),
            alert(3, AlertKind::Dependency, AlertState::Active, Severity::Critical),
            alert(1, AlertKind::Dependency, AlertState::Active, Severity::High),
        ];
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        let ids: Vec<u64> = alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 1, 9]);
    }
}
