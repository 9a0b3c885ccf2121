//! Run reporting: per-alert outcome records, run totals, and the
//! persisted summary artifact (JSON plus a SHA-256 digest sidecar that
//! is verified on load).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::{DepfixError, Result, Severity};

pub const SUMMARY_FILE: &str = "summary.json";
pub const DIGEST_FILE: &str = "summary.digest";

/// Why an alert produced no pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    NotDependencyKind,
    NotActive,
    BelowSeverityFilter,
    ExtractionFailed,
    NoFixedVersion,
    NoManifestFound,
    PackageNotInAnyManifest,
    ValidationFailed,
    BranchAlreadyExists,
    RunLimitReached,
    /// Branch/commit/PR write failed after retries; the error text is
    /// carried in the record's diagnostics.
    HostWriteFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NotDependencyKind => "not-dependency-kind",
            SkipReason::NotActive => "not-active",
            SkipReason::BelowSeverityFilter => "below-severity-filter",
            SkipReason::ExtractionFailed => "extraction-failed",
            SkipReason::NoFixedVersion => "no-fixed-version",
            SkipReason::NoManifestFound => "no-manifest-found",
            SkipReason::PackageNotInAnyManifest => "package-not-in-any-manifest",
            SkipReason::ValidationFailed => "validation-failed",
            SkipReason::BranchAlreadyExists => "branch-already-exists",
            SkipReason::RunLimitReached => "run-limit-reached",
            SkipReason::HostWriteFailed => "host-write-failed",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome for one processed alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertOutcome {
    PrCreated { pr_id: u64, branch: String },
    /// Dry run reached the commit step and stopped.
    DryRunWouldCreate { branch: String },
    Skipped { reason: SkipReason },
}

/// One line of the run summary: what happened to one alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub alert_id: u64,
    pub severity: Severity,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_version: Option<String>,
    pub outcome: AlertOutcome,
    /// Resolver or host diagnostics, present on validation and write
    /// failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    FetchFailed,
}

/// Immutable snapshot of one run, produced by [`RunReporter::finish`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub status: RunStatus,
    pub alerts_found: u64,
    pub alerts_matching_filter: u64,
    pub prs_created: u64,
    /// Skip counts keyed by kebab-case reason.
    pub skipped: BTreeMap<String, u64>,
    pub records: Vec<AlertRecord>,
}

/// Accumulates outcomes during a run; no side effects beyond that.
#[derive(Debug)]
pub struct RunReporter {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    dry_run: bool,
    alerts_found: u64,
    alerts_matching_filter: u64,
    prs_created: u64,
    skipped: BTreeMap<String, u64>,
    records: Vec<AlertRecord>,
}

impl RunReporter {
    pub fn new(dry_run: bool) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            dry_run,
            alerts_found: 0,
            alerts_matching_filter: 0,
            prs_created: 0,
            skipped: BTreeMap::new(),
            records: Vec::new(),
        }
    }

    pub fn alerts_found(&mut self, count: u64) {
        self.alerts_found = count;
    }

    pub fn alerts_matching_filter(&mut self, count: u64) {
        self.alerts_matching_filter = count;
    }

    pub fn record(&mut self, record: AlertRecord) {
        match &record.outcome {
            AlertOutcome::PrCreated { .. } => self.prs_created += 1,
            AlertOutcome::DryRunWouldCreate { .. } => {}
            AlertOutcome::Skipped { reason } => {
                *self.skipped.entry(reason.as_str().to_string()).or_insert(0) += 1;
            }
        }
        self.records.push(record);
    }

    pub fn prs_created(&self) -> u64 {
        self.prs_created
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn finish(self, status: RunStatus) -> RunSummary {
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            dry_run: self.dry_run,
            status,
            alerts_found: self.alerts_found,
            alerts_matching_filter: self.alerts_matching_filter,
            prs_created: self.prs_created,
            skipped: self.skipped,
            records: self.records,
        }
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Persist the summary as `<dir>/summary.json` plus a digest sidecar.
/// Returns the summary path.
pub fn write_summary_artifact(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let json = serde_json::to_vec_pretty(summary)?;
    let summary_path = dir.join(SUMMARY_FILE);
    fs::write(&summary_path, &json)?;
    fs::write(dir.join(DIGEST_FILE), digest_hex(&json))?;
    Ok(summary_path)
}

/// Load a persisted summary, verifying the digest sidecar first.
pub fn read_summary_artifact(dir: &Path) -> Result<RunSummary> {
    let json = fs::read(dir.join(SUMMARY_FILE))?;
    let expected = fs::read_to_string(dir.join(DIGEST_FILE))?;
    let actual = digest_hex(&json);
    if expected.trim() != actual {
        return Err(DepfixError::DigestMismatch {
            expected: expected.trim().to_string(),
            actual,
        });
    }
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skipped_record(id: u64, reason: SkipReason) -> AlertRecord {
        AlertRecord {
            alert_id: id,
            severity: Severity::High,
            title: format!("alert {id}"),
            package: None,
            fixed_version: None,
            outcome: AlertOutcome::Skipped { reason },
            diagnostics: None,
        }
    }

    #[test]
    fn reporter_tallies_outcomes() {
        let mut reporter = RunReporter::new(false);
        reporter.alerts_found(3);
        reporter.alerts_matching_filter(2);
        reporter.record(AlertRecord {
            alert_id: 1,
            severity: Severity::Critical,
            title: "alert 1".to_string(),
            package: Some("requests".to_string()),
            fixed_version: Some("2.31.0".to_string()),
            outcome: AlertOutcome::PrCreated {
                pr_id: 42,
                branch: "security/dependency-update/requests-2.31.0".to_string(),
            },
            diagnostics: None,
        });
        reporter.record(skipped_record(2, SkipReason::NoFixedVersion));
        reporter.record(skipped_record(3, SkipReason::NoFixedVersion));

        let summary = reporter.finish(RunStatus::Completed);
        assert_eq!(summary.prs_created, 1);
        assert_eq!(summary.skipped.get("no-fixed-version"), Some(&2));
        assert_eq!(summary.records.len(), 3);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn artifact_round_trips_with_digest() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunReporter::new(true).finish(RunStatus::Completed);
        write_summary_artifact(dir.path(), &summary).unwrap();

        let loaded = read_summary_artifact(dir.path()).unwrap();
        assert_eq!(loaded, summary);
    }

    #[test]
    fn tampered_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let summary = RunReporter::new(false).finish(RunStatus::Completed);
        write_summary_artifact(dir.path(), &summary).unwrap();

        let path = dir.path().join(SUMMARY_FILE);
        let mut json = fs::read_to_string(&path).unwrap();
        json.push(' ');
        fs::write(&path, json).unwrap();

        match read_summary_artifact(dir.path()) {
            Err(DepfixError::DigestMismatch { .. }) => {}
            other => panic!("expected digest mismatch, got {other:?}"),
        }
    }

    #[test]
    fn skip_reasons_serialize_kebab_case() {
        let json = serde_json::to_string(&SkipReason::BranchAlreadyExists).unwrap();
        assert_eq!(json, "\"branch-already-exists\"");
    }
}
