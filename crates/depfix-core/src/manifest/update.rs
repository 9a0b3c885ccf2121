//! Pure manifest rewriting. Never touches the filesystem: callers hand
//! in content, we hand back a [`FileEdit`] or nothing.

use std::cmp::Ordering;
use std::path::Path;

use regex::Regex;

use crate::domain::{FileEdit, ManifestDialect, ManifestTarget};
use crate::version::compare_versions;

/// Rewrite every pin of `package` in `content` to an exact `==fixed`
/// pin. Unrelated bytes are preserved exactly. Returns `None` when the
/// package does not appear, is already pinned to `fixed`, or is pinned
/// to something newer (a fix is never a downgrade), so the file is not
/// counted as changed.
pub fn apply_fix(
    path: &Path,
    dialect: ManifestDialect,
    content: &str,
    package: &str,
    fixed_version: &str,
) -> Option<FileEdit> {
    let (new_content, pinned_version) = match dialect {
        ManifestDialect::LinePinned => rewrite_line_pinned(content, package, fixed_version)?,
        ManifestDialect::TableDependencies => rewrite_table(content, package, fixed_version)?,
    };

    let changed_lines: Vec<usize> = content
        .lines()
        .zip(new_content.lines())
        .enumerate()
        .filter(|(_, (old, new))| old != new)
        .map(|(i, _)| i)
        .collect();
    if changed_lines.is_empty() {
        return None;
    }

    Some(FileEdit {
        target: ManifestTarget {
            path: path.to_path_buf(),
            dialect,
            pinned_version,
        },
        old_content: content.to_string(),
        new_content,
        changed_lines,
    })
}

/// `name==version` requirement lines. The exact-pin rewrite keeps the
/// name as written, any extras suffix, and any trailing comment or
/// environment marker.
fn rewrite_line_pinned(
    content: &str,
    package: &str,
    fixed_version: &str,
) -> Option<(String, Option<String>)> {
    let pattern = format!(
        r"(?i)^(\s*)({})(\[[^\]]*\])?\s*(==|>=|~=)\s*([0-9][A-Za-z0-9.]*)(.*)$",
        regex::escape(package)
    );
    let re = Regex::new(&pattern).ok()?;

    let mut pinned = None;
    let mut matched = false;
    let mut out = Vec::with_capacity(content.lines().count());
    for line in content.lines() {
        match re.captures(line) {
            Some(caps) => {
                let current = caps.get(5).map_or("", |m| m.as_str());
                if compare_versions(current, fixed_version) == Ordering::Greater {
                    // Already pinned past the fix; never downgrade.
                    out.push(line.to_string());
                    continue;
                }
                matched = true;
                if pinned.is_none() {
                    pinned = Some(current.to_string());
                }
                let indent = caps.get(1).map_or("", |m| m.as_str());
                let name = caps.get(2).map_or(package, |m| m.as_str());
                let extras = caps.get(3).map_or("", |m| m.as_str());
                let trailing = caps.get(6).map_or("", |m| m.as_str());
                out.push(format!("{indent}{name}{extras}=={fixed_version}{trailing}"));
            }
            None => out.push(line.to_string()),
        }
    }
    if !matched {
        return None;
    }

    let mut new_content = out.join("\n");
    if content.ends_with('\n') {
        new_content.push('\n');
    }
    Some((new_content, pinned))
}

/// Quoted dependency entries inside `dependencies = [...]` arrays and
/// the `[project.optional-dependencies]` tables of a pyproject file.
/// Nothing outside those contexts is eligible.
fn rewrite_table(
    content: &str,
    package: &str,
    fixed_version: &str,
) -> Option<(String, Option<String>)> {
    let array_open = Regex::new(r"^\s*[A-Za-z0-9_-]*\s*=\s*\[").ok()?;
    let dependencies_open = Regex::new(r"^\s*dependencies\s*=\s*\[").ok()?;
    let entry = Regex::new(&format!(
        r#"(?i)(["'])({})(\[[^\]]*\])?\s*((?:==|>=|~=|!=|<=?|>)\s*[^"']*)?(["'])"#,
        regex::escape(package)
    ))
    .ok()?;
    let version_in_spec = Regex::new(r"(?:==|>=|~=)\s*([0-9][A-Za-z0-9.]*)").ok()?;

    let mut in_optional_section = false;
    let mut in_dependency_array = false;
    let mut pinned = None;
    let mut matched = false;
    let mut out = Vec::with_capacity(content.lines().count());

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_optional_section = trimmed == "[project.optional-dependencies]";
            in_dependency_array = false;
            out.push(line.to_string());
            continue;
        }

        let opens = dependencies_open.is_match(line)
            || (in_optional_section && array_open.is_match(line));
        let eligible = opens || in_dependency_array;

        let mut rewritten = false;
        if eligible {
            if let Some(caps) = entry.captures(line) {
                let current = caps
                    .get(4)
                    .and_then(|spec| version_in_spec.captures(spec.as_str()))
                    .and_then(|v| v.get(1))
                    .map(|v| v.as_str().to_string());
                let downgrade = current
                    .as_deref()
                    .is_some_and(|cur| compare_versions(cur, fixed_version) == Ordering::Greater);
                if !downgrade {
                    matched = true;
                    if pinned.is_none() {
                        pinned = current;
                    }
                    let quote = caps.get(1).map_or("\"", |m| m.as_str());
                    let name = caps.get(2).map_or(package, |m| m.as_str());
                    let extras = caps.get(3).map_or("", |m| m.as_str());
                    let replacement = format!("{quote}{name}{extras}=={fixed_version}{quote}");
                    out.push(entry.replace(line, replacement.as_str()).into_owned());
                    rewritten = true;
                }
            }
        }
        if !rewritten {
            out.push(line.to_string());
        }

        if opens {
            in_dependency_array = !line.contains(']');
        } else if in_dependency_array && line.contains(']') {
            in_dependency_array = false;
        }
    }
    if !matched {
        return None;
    }

    let mut new_content = out.join("\n");
    if content.ends_with('\n') {
        new_content.push('\n');
    }
    Some((new_content, pinned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fix(dialect: ManifestDialect, content: &str) -> Option<FileEdit> {
        apply_fix(
            &PathBuf::from("requirements.txt"),
            dialect,
            content,
            "requests",
            "2.31.0",
        )
    }

    #[test]
    fn rewrites_single_pin_with_one_changed_line() {
        let content = "flask==2.0.0\nrequests==2.25.0\nurllib3==1.26.0\n";
        let edit = fix(ManifestDialect::LinePinned, content).unwrap();
        assert_eq!(
            edit.new_content,
            "flask==2.0.0\nrequests==2.31.0\nurllib3==1.26.0\n"
        );
        assert_eq!(edit.changed_lines, vec![1]);
        assert_eq!(edit.target.pinned_version.as_deref(), Some("2.25.0"));
    }

    #[test]
    fn range_operators_become_exact_pins() {
        let edit = fix(ManifestDialect::LinePinned, "requests>=2.20.0\n").unwrap();
        assert_eq!(edit.new_content, "requests==2.31.0\n");
    }

    #[test]
    fn extras_and_trailing_comment_survive() {
        let content = "requests[security]==2.25.0  # pinned for CVE audit\n";
        let edit = fix(ManifestDialect::LinePinned, content).unwrap();
        assert_eq!(
            edit.new_content,
            "requests[security]==2.31.0  # pinned for CVE audit\n"
        );
    }

    #[test]
    fn name_match_is_case_insensitive_and_whole() {
        let content = "Requests==2.25.0\nrequests-toolbelt==0.9.1\n";
        let edit = fix(ManifestDialect::LinePinned, content).unwrap();
        assert_eq!(
            edit.new_content,
            "Requests==2.31.0\nrequests-toolbelt==0.9.1\n"
        );
        assert_eq!(edit.changed_lines, vec![0]);
    }

    #[test]
    fn absent_package_leaves_file_untouched() {
        assert!(fix(ManifestDialect::LinePinned, "flask==2.0.0\n").is_none());
    }

    #[test]
    fn already_fixed_pin_is_not_counted_as_changed() {
        assert!(fix(ManifestDialect::LinePinned, "requests==2.31.0\n").is_none());
    }

    #[test]
    fn newer_pins_are_never_downgraded() {
        assert!(fix(ManifestDialect::LinePinned, "requests==2.32.3\n").is_none());

        let content = "requests==2.25.0\nrequests==2.32.3\n";
        let edit = fix(ManifestDialect::LinePinned, content).unwrap();
        assert_eq!(edit.new_content, "requests==2.31.0\nrequests==2.32.3\n");
        assert_eq!(edit.changed_lines, vec![0]);
    }

    #[test]
    fn rewrites_pyproject_dependencies_entry() {
        let content = concat!(
            "[project]\n",
            "name = \"svc\"\n",
            "dependencies = [\n",
            "    \"flask>=2.0\",\n",
            "    \"requests>=2.20.0\",\n",
            "]\n",
        );
        let edit = fix(ManifestDialect::TableDependencies, content).unwrap();
        assert!(edit.new_content.contains("\"requests==2.31.0\""));
        assert!(edit.new_content.contains("\"flask>=2.0\""));
        assert_eq!(edit.changed_lines, vec![4]);
        assert_eq!(edit.target.pinned_version.as_deref(), Some("2.20.0"));
    }

    #[test]
    fn rewrites_optional_dependency_tables() {
        let content = concat!(
            "[project.optional-dependencies]\n",
            "http = [\"requests==2.25.0\"]\n",
            "\n",
            "[tool.other]\n",
            "ignored = [\"requests==0.1\"]\n",
        );
        let edit = fix(ManifestDialect::TableDependencies, content).unwrap();
        assert!(edit.new_content.contains("http = [\"requests==2.31.0\"]"));
        // Arrays outside dependency sections are never rewritten.
        assert!(edit.new_content.contains("ignored = [\"requests==0.1\"]"));
    }

    #[test]
    fn pyproject_name_mention_outside_arrays_is_ignored() {
        let content = "[project]\nname = \"requests-wrapper\"\ndescription = \"uses requests\"\n";
        assert!(fix(ManifestDialect::TableDependencies, content).is_none());
    }
}
