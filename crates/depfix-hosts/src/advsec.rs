//! Advanced Security alert source client.
//!
//! Talks to the Advanced Security REST surface of an Azure DevOps
//! project and maps its wire records into [`Alert`]s. Only active
//! alerts are requested; everything else is filtered server-side.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::alert::{Alert, AlertKind, AlertState, Severity};
use crate::error::{HostError, HostResult};
use crate::retry::{with_retries, RetryPolicy};
use crate::traits::AlertSource;

const API_VERSION: &str = "7.2-preview.1";

/// Connection coordinates for one repository's alert feed.
#[derive(Debug, Clone)]
pub struct AdvSecConfig {
    /// Organization base URL, e.g. `https://advsec.dev.azure.com/my-org`.
    pub org_url: String,
    pub project: String,
    pub repository_id: String,
    pub repository_name: String,
    /// Personal access token used as basic-auth password.
    pub token: String,
}

impl AdvSecConfig {
    /// Build the configuration from environment variables, reporting
    /// every missing variable at once.
    pub fn from_env() -> HostResult<Self> {
        let wanted = [
            "DEVOPS_ORG_URL",
            "DEVOPS_PROJECT",
            "DEVOPS_REPO_ID",
            "DEVOPS_REPO_NAME",
            "DEVOPS_TOKEN",
        ];
        let mut values = Vec::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for name in wanted {
            match std::env::var(name) {
                Ok(v) if !v.is_empty() => values.push(v),
                _ => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(HostError::MissingEnv { vars: missing });
        }
        let mut it = values.into_iter();
        Ok(Self {
            org_url: it.next().unwrap_or_default().trim_end_matches('/').to_string(),
            project: it.next().unwrap_or_default(),
            repository_id: it.next().unwrap_or_default(),
            repository_name: it.next().unwrap_or_default(),
            token: it.next().unwrap_or_default(),
        })
    }

    fn alerts_url(&self) -> String {
        format!(
            "{}/{}/_apis/alert/repositories/{}/alerts",
            self.org_url, self.project, self.repository_id
        )
    }

    fn alert_detail_url(&self, alert_id: u64) -> String {
        format!("{}/{}", self.alerts_url(), alert_id)
    }
}

/// Wire shape of one alert record. Fields the scanner omits or spells
/// unexpectedly degrade to lenient defaults rather than parse errors.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAlert {
    alert_id: u64,
    #[serde(default)]
    alert_type: String,
    #[serde(default)]
    severity: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    code_snippet: Option<String>,
    #[serde(default)]
    recommendations: Vec<WireRecommendation>,
}

#[derive(Debug, Deserialize)]
struct WireRecommendation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireAlertList {
    #[serde(default)]
    value: Vec<WireAlert>,
}

impl From<WireAlert> for Alert {
    fn from(wire: WireAlert) -> Self {
        let kind = match wire.alert_type.to_ascii_lowercase().as_str() {
            "dependency" => AlertKind::Dependency,
            "code" => AlertKind::Code,
            "secret" => AlertKind::Secret,
            _ => AlertKind::Other,
        };
        let state = match wire.state.to_ascii_lowercase().as_str() {
            "active" => AlertState::Active,
            "dismissed" => AlertState::Dismissed,
            "fixed" => AlertState::Fixed,
            _ => AlertState::Other,
        };
        // Unknown severity sorts lowest so it never crowds out a
        // recognized alert under the PR budget.
        let severity = wire.severity.parse().unwrap_or(Severity::Low);

        Alert {
            id: wire.alert_id,
            kind,
            severity,
            state,
            title: wire.title,
            description: wire.description,
            code_snippet: wire.code_snippet,
            recommendations: wire
                .recommendations
                .into_iter()
                .map(|r| r.text)
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

/// Alert source backed by the Advanced Security REST API.
pub struct AdvSecAlertSource {
    config: AdvSecConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl AdvSecAlertSource {
    pub fn new(config: AdvSecConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("depfix/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            config,
            client,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> HostResult<Self> {
        Ok(Self::new(AdvSecConfig::from_env()?))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> HostResult<T> {
        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.config.token))
            .query(&[("criteria.states", "active"), ("api-version", API_VERSION)])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(HostError::Auth);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AlertSource for AdvSecAlertSource {
    async fn fetch_alerts(&self) -> HostResult<Vec<Alert>> {
        info!(
            repository = %self.config.repository_name,
            "fetching active alerts"
        );
        let url = self.config.alerts_url();
        let list: WireAlertList = with_retries(self.retry, "alert list", || {
            self.get_json(&url)
        })
        .await?;

        let alerts: Vec<Alert> = list.value.into_iter().map(Alert::from).collect();
        debug!(count = alerts.len(), "alerts fetched");
        Ok(alerts)
    }

    async fn fetch_alert_detail(&self, alert: &Alert) -> HostResult<Alert> {
        let url = self.config.alert_detail_url(alert.id);
        let wire: WireAlert =
            with_retries(self.retry, "alert detail", || self.get_json(&url)).await?;
        Ok(Alert::from(wire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_alert_maps_fields() {
        let wire: WireAlert = serde_json::from_value(serde_json::json!({
            "alertId": 12,
            "alertType": "dependency",
            "severity": "critical",
            "state": "active",
            "title": "Vulnerable package: requests",
            "description": "CVE-2023-32681 in requests",
            "recommendations": [{"text": "Upgrade to version 2.31.0 or later"}]
        }))
        .unwrap();

        let alert = Alert::from(wire);
        assert_eq!(alert.id, 12);
        assert_eq!(alert.kind, AlertKind::Dependency);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.state, AlertState::Active);
        assert_eq!(alert.recommendations.len(), 1);
    }

    #[test]
    fn wire_alert_degrades_unknown_fields() {
        let wire: WireAlert = serde_json::from_value(serde_json::json!({
            "alertId": 3,
            "alertType": "infrastructure",
            "severity": "unheard-of",
            "state": "snoozed",
            "title": "x"
        }))
        .unwrap();

        let alert = Alert::from(wire);
        assert_eq!(alert.kind, AlertKind::Other);
        assert_eq!(alert.state, AlertState::Other);
        assert_eq!(alert.severity, Severity::Low);
    }

    #[test]
    fn config_urls() {
        let config = AdvSecConfig {
            org_url: "https://advsec.dev.azure.com/acme".to_string(),
            project: "platform".to_string(),
            repository_id: "repo-1".to_string(),
            repository_name: "platform-api".to_string(),
            token: "t".to_string(),
        };
        assert_eq!(
            config.alerts_url(),
            "https://advsec.dev.azure.com/acme/platform/_apis/alert/repositories/repo-1/alerts"
        );
        assert!(config.alert_detail_url(9).ends_with("/alerts/9"));
    }
}
