//! Manifest discovery: a deterministic walk of the repository root.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::ManifestDialect;

use super::{dialect_for_file, is_ignored_dir};

/// One manifest file found under the repository root. The path is
/// relative to the root so it can go straight into commit payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredManifest {
    pub path: PathBuf,
    pub dialect: ManifestDialect,
}

/// Walk `root` and return every recognized manifest, sorted by path.
/// An empty repository yields an empty list, and an unreadable
/// directory is logged and skipped rather than failing the walk, so
/// discovery never aborts a run.
pub fn locate_manifests(root: &Path) -> Vec<DiscoveredManifest> {
    let mut found = Vec::new();
    walk(root, root, &mut found);
    found.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(event = "manifest.located", count = found.len());
    found
}

fn walk(root: &Path, dir: &Path, found: &mut Vec<DiscoveredManifest>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(event = "manifest.dir_unreadable", path = %dir.display(), error = %err);
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(event = "manifest.entry_unreadable", path = %path.display(), error = %err);
                continue;
            }
        };

        if file_type.is_dir() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_ignored_dir(&name) {
                continue;
            }
            walk(root, &path, found);
        } else if file_type.is_file() {
            if let Some(dialect) = dialect_for_file(&path) {
                let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
                found.push(DiscoveredManifest {
                    path: relative,
                    dialect,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn finds_manifests_sorted_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("requirements/dev.txt"));
        touch(&root.join("requirements.txt"));
        touch(&root.join("svc/pyproject.toml"));
        touch(&root.join("docs/readme.txt"));

        let found = locate_manifests(root);
        let paths: Vec<_> = found.iter().map(|m| m.path.clone()).collect();
        // Path ordering is component-wise, so the requirements/
        // directory sorts ahead of the bare requirements.txt.
        assert_eq!(
            paths,
            vec![
                PathBuf::from("requirements/dev.txt"),
                PathBuf::from("requirements.txt"),
                PathBuf::from("svc/pyproject.toml"),
            ]
        );
        assert_eq!(found[2].dialect, ManifestDialect::TableDependencies);
    }

    #[test]
    fn skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join(".venv/requirements.txt"));
        touch(&root.join("node_modules/pkg/requirements.txt"));
        touch(&root.join("app/requirements.txt"));

        let found = locate_manifests(root);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("app/requirements.txt"));
    }

    #[test]
    fn empty_root_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(locate_manifests(dir.path()).is_empty());
    }

    #[test]
    fn unreadable_root_yields_empty_not_failure() {
        // The read_dir error path must degrade to "nothing found".
        let found = locate_manifests(Path::new("/no/such/depfix/root"));
        assert!(found.is_empty());
    }
}
