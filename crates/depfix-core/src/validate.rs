//! Change-set validation through the external dependency resolver.
//!
//! All-or-nothing per alert: every rewritten manifest must resolve
//! cleanly or the whole change-set is rejected and nothing is written.

use std::path::PathBuf;

use depfix_hosts::DependencyResolver;
use tracing::{debug, warn};

use crate::domain::FileEdit;

/// Verdict for one alert's proposed edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Every manifest resolved; generated lockfiles, if any, attach to
    /// the change-set.
    Accepted { lockfiles: Vec<PathBuf> },
    /// At least one manifest failed to resolve. Diagnostics carry the
    /// resolver output for the summary record.
    Rejected { diagnostics: String },
}

/// Run the resolver over every proposed edit. A resolver invocation
/// error counts as a rejection with the error text as diagnostics;
/// transient conditions were already retried below this layer.
pub async fn validate_edits<R>(resolver: &R, edits: &[FileEdit]) -> ValidationOutcome
where
    R: DependencyResolver + ?Sized,
{
    let mut failures = Vec::new();
    for edit in edits {
        let path = edit.target.path.to_string_lossy().to_string();
        match resolver.check(&path, &edit.new_content).await {
            Ok(check) if check.ok => {
                debug!(event = "validate.passed", manifest = %path);
            }
            Ok(check) => {
                warn!(event = "validate.failed", manifest = %path, diagnostics = %check.diagnostics);
                failures.push(format!("{path}: {}", check.diagnostics));
            }
            Err(err) => {
                warn!(event = "validate.error", manifest = %path, error = %err);
                failures.push(format!("{path}: {err}"));
            }
        }
    }
    if !failures.is_empty() {
        return ValidationOutcome::Rejected {
            diagnostics: failures.join("; "),
        };
    }

    // Lockfile generation is best-effort: an unavailable generator is
    // not a validation failure.
    let mut lockfiles = Vec::new();
    for edit in edits {
        let path = edit.target.path.to_string_lossy().to_string();
        match resolver.generate_lockfile(&path).await {
            Ok(Some(lockfile)) => lockfiles.push(PathBuf::from(lockfile)),
            Ok(None) => {}
            Err(err) => {
                warn!(event = "validate.lockfile_error", manifest = %path, error = %err);
            }
        }
    }
    ValidationOutcome::Accepted { lockfiles }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ManifestDialect, ManifestTarget};
    use depfix_hosts::ScriptedResolver;

    fn edit(path: &str, content: &str) -> FileEdit {
        FileEdit {
            target: ManifestTarget {
                path: PathBuf::from(path),
                dialect: ManifestDialect::LinePinned,
                pinned_version: Some("2.25.0".to_string()),
            },
            old_content: String::new(),
            new_content: content.to_string(),
            changed_lines: vec![0],
        }
    }

    #[tokio::test]
    async fn all_edits_passing_is_accepted() {
        let resolver = ScriptedResolver::passing();
        let edits = vec![
            edit("requirements.txt", "requests==2.31.0\n"),
            edit("requirements/dev.txt", "requests==2.31.0\n"),
        ];
        let outcome = validate_edits(&resolver, &edits).await;
        assert_eq!(
            outcome,
            ValidationOutcome::Accepted {
                lockfiles: Vec::new()
            }
        );
    }

    #[tokio::test]
    async fn one_failure_rejects_the_whole_set() {
        let resolver = ScriptedResolver::passing().failing_on("dev", "resolution conflict");
        let edits = vec![
            edit("requirements.txt", "requests==2.31.0\n"),
            edit("requirements/dev.txt", "requests==2.31.0 # dev\n"),
        ];
        match validate_edits(&resolver, &edits).await {
            ValidationOutcome::Rejected { diagnostics } => {
                assert!(diagnostics.contains("resolution conflict"));
                assert!(diagnostics.contains("requirements/dev.txt"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lockfiles_attach_on_acceptance() {
        let resolver = ScriptedResolver::passing().with_lockfile_suffix("lock");
        let edits = vec![edit("requirements.txt", "requests==2.31.0\n")];
        match validate_edits(&resolver, &edits).await {
            ValidationOutcome::Accepted { lockfiles } => {
                assert_eq!(lockfiles, vec![PathBuf::from("requirements.txt.lock")]);
            }
            other => panic!("expected acceptance, got {other:?}"),
        }
    }
}
