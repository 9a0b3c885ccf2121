//! Alert records as fetched from the external scanner.

use serde::{Deserialize, Serialize};

/// Alert severity, totally ordered (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert category. Only `Dependency` alerts are remediated; anything
/// the source reports outside the known set maps to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Dependency,
    Code,
    Secret,
    #[serde(other)]
    Other,
}

/// Alert lifecycle state. Only `Active` alerts are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    Active,
    Dismissed,
    Fixed,
    #[serde(other)]
    Other,
}

/// One vulnerability finding from the external scanner. Immutable once
/// fetched; owned by the orchestrator for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub kind: AlertKind,
    pub severity: Severity,
    pub state: AlertState,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl Alert {
    /// Whether this alert is a candidate for remediation at all,
    /// before the severity floor is applied.
    pub fn is_candidate(&self) -> bool {
        self.kind == AlertKind::Dependency && self.state == AlertState::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_total_order() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
    }

    #[test]
    fn unknown_kind_maps_to_other() {
        let alert: Alert = serde_json::from_value(serde_json::json!({
            "id": 7,
            "kind": "license",
            "severity": "high",
            "state": "active",
            "title": "Some finding"
        }))
        .unwrap();
        assert_eq!(alert.kind, AlertKind::Other);
        assert!(!alert.is_candidate());
    }

    #[test]
    fn dependency_active_is_candidate() {
        let alert = Alert {
            id: 1,
            kind: AlertKind::Dependency,
            severity: Severity::High,
            state: AlertState::Active,
            title: "Update requests to fix CVE-2023-32681".to_string(),
            description: String::new(),
            code_snippet: None,
            recommendations: vec![],
        };
        assert!(alert.is_candidate());
    }
}
