//! Domain model: alerts, extracted facts, manifest targets, errors.

pub mod changeset;
pub mod error;
pub mod fact;

pub use changeset::{ChangeSet, FileEdit, ManifestDialect, ManifestTarget};
pub use error::{DepfixError, Result};
pub use fact::{FactSource, PackageFact, Sourced};

// Alert records are owned by the host layer, which deserializes them
// off the wire; the domain re-exports them unchanged.
pub use depfix_hosts::{Alert, AlertKind, AlertState, Severity};
