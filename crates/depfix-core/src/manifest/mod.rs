//! Dependency-manifest discovery and rewriting.

pub mod locate;
pub mod update;

pub use locate::{locate_manifests, DiscoveredManifest};
pub use update::apply_fix;

use std::path::Path;

use crate::domain::ManifestDialect;

/// Directory names skipped during discovery. Scanner output and vendored
/// trees routinely contain requirement files that must never be edited.
pub const DEFAULT_IGNORES: &[&str] = &[
    ".git",
    "node_modules",
    "venv",
    ".venv",
    "__pycache__",
    ".tox",
    "site-packages",
];

pub(crate) fn is_ignored_dir(name: &str) -> bool {
    DEFAULT_IGNORES.contains(&name)
}

/// Map a path onto a manifest dialect, if it is one we edit. Covers
/// `requirements*.txt` anywhere plus any `.txt` inside a `requirements/`
/// directory (the split-requirements layout: `requirements/dev.txt`).
pub fn dialect_for_file(path: &Path) -> Option<ManifestDialect> {
    let name = path.file_name()?.to_str()?;
    if name == "pyproject.toml" {
        return Some(ManifestDialect::TableDependencies);
    }
    if name.ends_with(".txt") {
        if name.starts_with("requirements") {
            return Some(ManifestDialect::LinePinned);
        }
        let parent = path.parent()?.file_name()?.to_str()?;
        if parent == "requirements" {
            return Some(ManifestDialect::LinePinned);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn recognizes_manifest_names() {
        let cases = [
            ("requirements.txt", Some(ManifestDialect::LinePinned)),
            ("requirements-dev.txt", Some(ManifestDialect::LinePinned)),
            ("requirements/dev.txt", Some(ManifestDialect::LinePinned)),
            ("pyproject.toml", Some(ManifestDialect::TableDependencies)),
            ("setup.py", None),
            ("docs/notes.txt", None),
            ("requirements.md", None),
        ];
        for (name, expected) in cases {
            assert_eq!(dialect_for_file(&PathBuf::from(name)), expected, "{name}");
        }
    }

    #[test]
    fn ignores_vendor_directories() {
        assert!(is_ignored_dir(".git"));
        assert!(is_ignored_dir("site-packages"));
        assert!(!is_ignored_dir("src"));
    }
}
