//! Package-fact extraction from alert free text.
//!
//! Each field (name, current version, fixed version, CVE) is resolved
//! by its own ordered chain of pure strategies; the first strategy to
//! produce a value wins and tags the field with its [`FactSource`].
//! Extraction never errors: malformed or unrecognizable input simply
//! yields no fact, which the orchestrator records as a normal skip.

use regex::Regex;

use crate::domain::{Alert, FactSource, PackageFact, Sourced};

/// Already-read manifest contents, supplied by the caller so the
/// current-version fallback can cross-reference them without touching
/// the filesystem.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    pub path: String,
    pub content: String,
}

/// Curated package identifiers matched as whole words in titles before
/// any looser phrasing is tried. Title hits from this list are the
/// highest-confidence name source.
const KNOWN_PACKAGES: &[&str] = &[
    "aiohttp",
    "certifi",
    "cryptography",
    "django",
    "flask",
    "jinja2",
    "lxml",
    "numpy",
    "paramiko",
    "pillow",
    "pip",
    "pyyaml",
    "requests",
    "setuptools",
    "sqlalchemy",
    "tornado",
    "urllib3",
    "werkzeug",
];

/// Extract a [`PackageFact`] from one alert. Returns `None` when no
/// package name can be resolved; the other fields are each optional.
pub fn extract_package_fact(alert: &Alert, manifests: &[ManifestSnapshot]) -> Option<PackageFact> {
    let name = extract_name(alert)?;
    let current_version = extract_current_version(alert, &name.value, manifests);
    let fixed_version = extract_fixed_version(alert, &name.value);
    let cve = extract_cve(alert);

    Some(PackageFact {
        name,
        current_version,
        fixed_version,
        cve,
    })
}

// ---------------------------------------------------------------------------
// Name
// ---------------------------------------------------------------------------

fn extract_name(alert: &Alert) -> Option<Sourced<String>> {
    if let Some(name) = known_package_in(&alert.title) {
        return Some(Sourced::new(name, FactSource::KnownList));
    }
    if let Some(name) = name_from_phrasings(&alert.title) {
        return Some(Sourced::new(name, FactSource::TitlePhrase));
    }
    if let Some(name) = backticked_identifier(&alert.title) {
        return Some(Sourced::new(name, FactSource::Backticks));
    }
    // Title always outranks description to avoid cross-package
    // bleed-through in long advisory texts.
    if let Some(name) = known_package_in(&alert.description)
        .or_else(|| name_from_phrasings(&alert.description))
        .or_else(|| backticked_identifier(&alert.description))
    {
        return Some(Sourced::new(name, FactSource::Description));
    }
    None
}

fn known_package_in(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    for pkg in KNOWN_PACKAGES {
        // `\b` treats `-`, `.` and `_` as boundaries, which would let
        // `requests` match inside `requests-toolbelt`. Package names
        // only count when flanked by genuine non-identifier characters.
        let pattern = format!(
            r"(?:^|[^A-Za-z0-9._-]){}(?:[^A-Za-z0-9._-]|$)",
            regex::escape(pkg)
        );
        let re = Regex::new(&pattern).ok()?;
        if re.is_match(&lower) {
            return Some((*pkg).to_string());
        }
    }
    None
}

const NAME_PATTERNS: &[&str] = &[
    r"(?i)\bupdate\s+([A-Za-z0-9][A-Za-z0-9._-]*)\s+to\b",
    r"(?i)vulnerable\s+package[:\s]+([A-Za-z0-9][A-Za-z0-9._-]*)",
    r"(?i)\b([A-Za-z0-9][A-Za-z0-9._-]*)\s+has\s+a\s+security\s+issue",
    r"(?i)security\s+issue\s+in\s+([A-Za-z0-9][A-Za-z0-9._-]*)",
];

fn name_from_phrasings(text: &str) -> Option<String> {
    for pattern in NAME_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(text) {
            return Some(caps.get(1)?.as_str().to_lowercase());
        }
    }
    None
}

fn backticked_identifier(text: &str) -> Option<String> {
    let re = Regex::new(r"`([A-Za-z0-9][A-Za-z0-9._-]*)`").ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

// ---------------------------------------------------------------------------
// Current version
// ---------------------------------------------------------------------------

fn extract_current_version(
    alert: &Alert,
    name: &str,
    manifests: &[ManifestSnapshot],
) -> Option<Sourced<String>> {
    if let Some(snippet) = &alert.code_snippet {
        if let Some(version) = pinned_version_in(snippet, name) {
            return Some(Sourced::new(version, FactSource::Snippet));
        }
    }
    if let Some(version) = current_from_description(&alert.description) {
        return Some(Sourced::new(version, FactSource::Description));
    }
    for snapshot in manifests {
        if let Some(version) = pinned_version_in(&snapshot.content, name) {
            return Some(Sourced::new(version, FactSource::ManifestScan));
        }
    }
    None
}

/// First `name==version` (or `>=`/`~=`) pin for the package in a block
/// of requirement-style lines.
fn pinned_version_in(text: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r"(?im)^\s*{}\s*(?:\[[^\]]*\])?\s*(?:==|>=|~=)\s*([0-9][A-Za-z0-9.]*)",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

const CURRENT_VERSION_PATTERNS: &[&str] = &[
    r"(?i)version\s+([0-9][A-Za-z0-9.]*)\s+is\s+vulnerable",
    r"(?i)affects\s+versions\s+before\s+([0-9][A-Za-z0-9.]*)",
];

fn current_from_description(description: &str) -> Option<String> {
    for pattern in CURRENT_VERSION_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(description) {
            return Some(caps.get(1)?.as_str().to_string());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Fixed version
// ---------------------------------------------------------------------------

const RECOMMENDATION_PATTERNS: &[&str] = &[
    r"(?i)upgrade\s+to\s+version\s+([0-9][A-Za-z0-9.]*)",
    r"(?i)update\s+to\s+at\s+least\s+version\s+([0-9][A-Za-z0-9.]*)",
];

const FIXED_DESCRIPTION_PATTERNS: &[&str] = &[
    r"(?i)fixed\s+in\s+(?:version\s+)?([0-9][A-Za-z0-9.]*)",
    r"(?i)([0-9][A-Za-z0-9.]*)\s+or\s+later",
];

fn extract_fixed_version(alert: &Alert, name: &str) -> Option<Sourced<String>> {
    for rec in &alert.recommendations {
        for pattern in RECOMMENDATION_PATTERNS {
            let re = Regex::new(pattern).ok()?;
            if let Some(caps) = re.captures(rec) {
                return Some(Sourced::new(
                    caps.get(1)?.as_str().to_string(),
                    FactSource::Recommendation,
                ));
            }
        }
    }
    for pattern in FIXED_DESCRIPTION_PATTERNS {
        let re = Regex::new(pattern).ok()?;
        if let Some(caps) = re.captures(&alert.description) {
            return Some(Sourced::new(
                caps.get(1)?.as_str().to_string(),
                FactSource::Description,
            ));
        }
    }
    // "update <pkg> from A to B" in the title yields B.
    let pattern = format!(
        r"(?i)update\s+{}\s+from\s+[0-9][A-Za-z0-9.]*\s+to\s+([0-9][A-Za-z0-9.]*)",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    if let Some(caps) = re.captures(&alert.title) {
        return Some(Sourced::new(
            caps.get(1)?.as_str().to_string(),
            FactSource::TitleRange,
        ));
    }
    None
}

// ---------------------------------------------------------------------------
// CVE
// ---------------------------------------------------------------------------

fn extract_cve(alert: &Alert) -> Option<Sourced<String>> {
    let mut haystack = format!("{} {}", alert.title, alert.description);
    if let Some(snippet) = &alert.code_snippet {
        haystack.push(' ');
        haystack.push_str(snippet);
    }
    for rec in &alert.recommendations {
        haystack.push(' ');
        haystack.push_str(rec);
    }

    let re = Regex::new(r"(?i)(CVE-\d{4}-\d+)").ok()?;
    re.captures(&haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| Sourced::new(m.as_str().to_uppercase(), FactSource::CvePattern))
}
