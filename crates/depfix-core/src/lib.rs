//! depfix-core — domain model and decision logic for the dependency
//! remediation pipeline.
//!
//! The pipeline turns scanner alerts into pull requests: extract
//! package facts from alert text, locate and rewrite the manifests
//! that pin the package, validate the rewrite through an external
//! resolver, and open one branch + PR per alert under hard safety
//! limits. External collaborators (alert source, VCS host, resolver)
//! live behind the trait seams in `depfix-hosts`; everything in this
//! crate is testable against the in-memory fakes.

pub mod domain;
pub mod extract;
pub mod manifest;
pub mod obs;
pub mod orchestrator;
pub mod report;
pub mod telemetry;
pub mod validate;
pub mod version;

pub use domain::{
    Alert, AlertKind, AlertState, ChangeSet, DepfixError, FactSource, FileEdit, ManifestDialect,
    ManifestTarget, PackageFact, Result, Severity, Sourced,
};
pub use extract::{extract_package_fact, ManifestSnapshot};
pub use manifest::{apply_fix, locate_manifests, DiscoveredManifest};
pub use orchestrator::{
    branch_name, RemediationOrchestrator, RunConfig, RunLimits, BRANCH_PREFIX,
};
pub use report::{
    read_summary_artifact, write_summary_artifact, AlertOutcome, AlertRecord, RunReporter,
    RunStatus, RunSummary, SkipReason,
};
pub use telemetry::init_tracing;
pub use validate::{validate_edits, ValidationOutcome};
pub use version::{compare_versions, Version};

/// Crate version, surfaced by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
