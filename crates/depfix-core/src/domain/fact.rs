//! Structured facts extracted from one alert.

use serde::{Deserialize, Serialize};

/// Which extraction strategy produced a field. Recorded per field so a
/// summary reader can tell a curated-list hit from a loose description
/// scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    /// Curated known-package list matched in the title.
    KnownList,
    /// Title phrasing such as "Update X to fix ...".
    TitlePhrase,
    /// Backtick-quoted identifier.
    Backticks,
    /// Same patterns applied to the description.
    Description,
    /// `name==version` line in the code snippet.
    Snippet,
    /// Cross-reference against discovered manifest contents.
    ManifestScan,
    /// Recommendation text ("upgrade to version X or later").
    Recommendation,
    /// Title of the form "update X from A to B".
    TitleRange,
    /// `CVE-YYYY-NNNN` pattern anywhere in the alert text.
    CvePattern,
}

/// A field value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: FactSource,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: FactSource) -> Self {
        Self { value, source }
    }
}

/// The package/version/CVE facts extracted from one alert. Derived per
/// alert, never persisted across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFact {
    pub name: Sourced<String>,
    pub current_version: Option<Sourced<String>>,
    pub fixed_version: Option<Sourced<String>>,
    pub cve: Option<Sourced<String>>,
}

impl PackageFact {
    /// An alert with no fixed version is not actionable.
    pub fn is_actionable(&self) -> bool {
        self.fixed_version.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actionable_requires_fixed_version() {
        let fact = PackageFact {
            name: Sourced::new("requests".to_string(), FactSource::TitlePhrase),
            current_version: None,
            fixed_version: None,
            cve: None,
        };
        assert!(!fact.is_actionable());

        let fact = PackageFact {
            fixed_version: Some(Sourced::new(
                "2.31.0".to_string(),
                FactSource::Recommendation,
            )),
            ..fact
        };
        assert!(fact.is_actionable());
    }
}
