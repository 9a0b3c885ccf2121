//! Dependency version parsing and ordering.
//!
//! Handles the dotted-numeric versions that appear in pinned Python
//! requirements (`2.31.0`, `1.4`, `5.0.0rc1`). The comparator is total:
//! strings the parser cannot make sense of fall back to plain string
//! comparison rather than erroring, so sorting mixed input never fails.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A parsed dependency version: dotted numeric components plus an
/// optional pre-release fragment (`rc1`, `b2`, `alpha`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    parts: Vec<u64>,
    pre: Option<String>,
}

impl Version {
    /// Parse a version string. Returns `None` when no leading numeric
    /// component exists at all.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut parts = Vec::new();
        let mut pre = None;

        for (i, component) in s.split('.').enumerate() {
            let digits: String = component.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                if i == 0 {
                    return None;
                }
                // A wholly non-numeric tail component is a pre-release tag.
                pre = Some(component.to_string());
                break;
            }
            parts.push(digits.parse().ok()?);

            let rest = &component[digits.len()..];
            if !rest.is_empty() {
                // "0rc1" style: numeric prefix plus pre-release suffix.
                pre = Some(rest.trim_start_matches('-').to_string());
                break;
            }
        }

        if parts.is_empty() {
            return None;
        }
        Some(Self { parts, pre })
    }

    /// Whether this version carries a pre-release fragment.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        // Same numeric components: a pre-release sorts before the release.
        match (&self.pre, &other.pre) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .parts
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(".");
        match &self.pre {
            Some(pre) => write!(f, "{joined}{pre}"),
            None => write!(f, "{joined}"),
        }
    }
}

/// Total ordering over raw version strings. Parseable strings compare
/// numerically; anything else falls back to string order.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_versions() {
        let v = Version::parse("2.31.0").unwrap();
        assert_eq!(v.to_string(), "2.31.0");
        assert!(!v.is_prerelease());
    }

    #[test]
    fn numeric_ordering_beats_lexical() {
        assert_eq!(compare_versions("2.9.0", "2.31.0"), Ordering::Less);
        assert_eq!(compare_versions("10.0", "9.9"), Ordering::Greater);
    }

    #[test]
    fn missing_components_are_zero() {
        assert_eq!(compare_versions("1.4", "1.4.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.4", "1.4.1"), Ordering::Less);
    }

    #[test]
    fn prerelease_sorts_before_release() {
        assert_eq!(compare_versions("5.0.0rc1", "5.0.0"), Ordering::Less);
        assert!(Version::parse("5.0.0rc1").unwrap().is_prerelease());
    }

    #[test]
    fn unparseable_falls_back_to_string_order() {
        assert_eq!(compare_versions("latest", "stable"), Ordering::Less);
        assert!(Version::parse("latest").is_none());
    }

    #[test]
    fn display_round_trip() {
        for s in ["2.31.0", "1.4", "5.0.0rc1"] {
            assert_eq!(Version::parse(s).unwrap().to_string(), s);
        }
    }
}
