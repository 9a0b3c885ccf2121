//! Manifest targets and the proposed change-set for one alert.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Closed set of manifest dialects the updater understands. Adding a
/// dialect is a compile-time-checked addition, not a string branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestDialect {
    /// Line-based pinned requirements (`requirements*.txt`).
    LinePinned,
    /// Table-based project manifest (`pyproject.toml`).
    TableDependencies,
}

impl ManifestDialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestDialect::LinePinned => "requirements",
            ManifestDialect::TableDependencies => "pyproject",
        }
    }
}

/// One manifest file that pins the alert's package. The `pinned_version`
/// is the value found on disk, which is authoritative for the rewrite
/// even when the alert reports a different current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestTarget {
    pub path: PathBuf,
    pub dialect: ManifestDialect,
    pub pinned_version: Option<String>,
}

/// One in-memory file rewrite produced by the updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEdit {
    pub target: ManifestTarget,
    pub old_content: String,
    pub new_content: String,
    /// Zero-based indices of lines that changed. The per-file line
    /// limit is enforced against this, never a raw diff count.
    pub changed_lines: Vec<usize>,
}

/// The full set of edits proposed to remediate one alert. Belongs to
/// exactly one alert and exactly one branch; applied once or discarded,
/// never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub alert_id: u64,
    pub branch: String,
    pub edits: Vec<FileEdit>,
    /// Lockfiles regenerated after validation, if any.
    pub lockfiles: Vec<PathBuf>,
}

impl ChangeSet {
    pub fn new(alert_id: u64, branch: impl Into<String>) -> Self {
        Self {
            alert_id,
            branch: branch.into(),
            edits: Vec::new(),
            lockfiles: Vec::new(),
        }
    }

    /// Number of files this change-set touches.
    pub fn file_count(&self) -> usize {
        self.edits.len()
    }

    /// Largest per-file changed-line count, used for the safety check.
    pub fn max_changed_lines(&self) -> usize {
        self.edits
            .iter()
            .map(|e| e.changed_lines.len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edit(path: &str, changed: Vec<usize>) -> FileEdit {
        FileEdit {
            target: ManifestTarget {
                path: PathBuf::from(path),
                dialect: ManifestDialect::LinePinned,
                pinned_version: Some("1.0.0".to_string()),
            },
            old_content: String::new(),
            new_content: String::new(),
            changed_lines: changed,
        }
    }

    #[test]
    fn change_set_counts() {
        let mut cs = ChangeSet::new(7, "security/dependency-update/requests-2.31.0");
        cs.edits.push(edit("requirements.txt", vec![0]));
        cs.edits.push(edit("requirements/dev.txt", vec![2, 3]));

        assert_eq!(cs.file_count(), 2);
        assert_eq!(cs.max_changed_lines(), 2);
    }

    #[test]
    fn empty_change_set_has_zero_lines() {
        let cs = ChangeSet::new(1, "b");
        assert_eq!(cs.max_changed_lines(), 0);
    }
}
