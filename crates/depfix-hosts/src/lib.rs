//! External collaborator layer for depfix.
//!
//! Defines the trait seams the remediation pipeline depends on
//! (`AlertSource`, `VcsHost`, `DependencyResolver`), the real clients
//! that implement them against Advanced Security, Azure DevOps Git,
//! and pip, and in-memory fakes for tests.

pub mod advsec;
pub mod alert;
pub mod devops;
pub mod error;
pub mod fakes;
pub mod pip;
pub mod retry;
pub mod traits;

pub use advsec::{AdvSecAlertSource, AdvSecConfig};
pub use alert::{Alert, AlertKind, AlertState, Severity};
pub use devops::{DevOpsGitConfig, DevOpsGitHost};
pub use error::{HostError, HostResult};
pub use fakes::{MemoryAlertSource, MemoryVcsHost, RecordedCommit, ScriptedResolver};
pub use pip::{PipResolver, PipResolverConfig};
pub use retry::{with_retries, RetryPolicy};
pub use traits::{
    AlertSource, CommitFile, DependencyResolver, NewPullRequest, PullRequestId, ResolverCheck,
    VcsHost,
};
