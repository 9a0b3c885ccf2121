//! Azure DevOps Git client: branches, commits, and pull requests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{HostError, HostResult};
use crate::retry::{with_retries, RetryPolicy};
use crate::traits::{CommitFile, NewPullRequest, PullRequestId, VcsHost};

const GIT_API_VERSION: &str = "7.0";

/// Zero object id, used when creating a ref that does not exist yet.
const ZERO_OID: &str = "0000000000000000000000000000000000000000";

/// Connection coordinates for the repository's git surface.
#[derive(Debug, Clone)]
pub struct DevOpsGitConfig {
    /// Organization base URL, e.g. `https://dev.azure.com/my-org`.
    pub org_url: String,
    pub project: String,
    pub repository_id: String,
    pub token: String,
}

impl DevOpsGitConfig {
    pub fn from_env() -> HostResult<Self> {
        let wanted = [
            "DEVOPS_GIT_URL",
            "DEVOPS_PROJECT",
            "DEVOPS_REPO_ID",
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
            token: it.next().unwrap_or_default(),
        })
    }

    fn repo_url(&self) -> String {
        format!(
            "{}/{}/_apis/git/repositories/{}",
            self.org_url, self.project, self.repository_id
        )
    }
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "objectId")]
    object_id: String,
}

#[derive(Debug, Deserialize)]
struct GitRefList {
    #[serde(default)]
    value: Vec<GitRef>,
}

#[derive(Debug, Deserialize)]
struct CreatedPullRequest {
    #[serde(rename = "pullRequestId")]
    pull_request_id: u64,
}

/// VCS host backed by the Azure DevOps Git REST API.
pub struct DevOpsGitHost {
    config: DevOpsGitConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl DevOpsGitHost {
    pub fn new(config: DevOpsGitConfig) -> Self {
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
        Ok(Self::new(DevOpsGitConfig::from_env()?))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn check_status(response: reqwest::Response) -> HostResult<reqwest::Response> {
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
        Ok(response)
    }

    /// Tip object id of a branch, or `None` when the ref is absent.
    async fn branch_tip(&self, branch: &str) -> HostResult<Option<String>> {
        let url = format!("{}/refs", self.config.repo_url());
        let filter = format!("heads/{branch}");
        let response = self
            .client
            .get(&url)
            .basic_auth("", Some(&self.config.token))
            .query(&[("filter", filter.as_str()), ("api-version", GIT_API_VERSION)])
            .send()
            .await?;
        let list: GitRefList = Self::check_status(response).await?.json().await?;
        Ok(list.value.into_iter().next().map(|r| r.object_id))
    }

    async fn post_json(&self, url: &str, body: serde_json::Value) -> HostResult<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .basic_auth("", Some(&self.config.token))
            .query(&[("api-version", GIT_API_VERSION)])
            .json(&body)
            .send()
            .await?;
        Self::check_status(response).await
    }
}

#[async_trait]
impl VcsHost for DevOpsGitHost {
    async fn branch_exists(&self, branch: &str) -> HostResult<bool> {
        let tip = with_retries(self.retry, "branch lookup", || self.branch_tip(branch)).await?;
        Ok(tip.is_some())
    }

    async fn create_branch(&self, branch: &str, base: &str) -> HostResult<()> {
        let base_tip = with_retries(self.retry, "base tip lookup", || self.branch_tip(base))
            .await?
            .ok_or_else(|| HostError::Status {
                code: 404,
                body: format!("base branch not found: {base}"),
            })?;

        let url = format!("{}/refs", self.config.repo_url());
        let body = json!([{
            "name": format!("refs/heads/{branch}"),
            "oldObjectId": ZERO_OID,
            "newObjectId": base_tip,
        }]);
        with_retries(self.retry, "branch create", || {
            self.post_json(&url, body.clone())
        })
        .await?;
        debug!(branch = %branch, base = %base, "branch created");
        Ok(())
    }

    async fn commit_files(
        &self,
        branch: &str,
        files: &[CommitFile],
        message: &str,
    ) -> HostResult<()> {
        let tip = with_retries(self.retry, "branch tip lookup", || self.branch_tip(branch))
            .await?
            .ok_or_else(|| HostError::Status {
                code: 404,
                body: format!("branch not found: {branch}"),
            })?;

        let changes: Vec<serde_json::Value> = files
            .iter()
            .map(|f| {
                json!({
                    "changeType": "edit",
                    "item": { "path": format!("/{}", f.path.trim_start_matches('/')) },
                    "newContent": { "content": f.content, "contentType": "rawtext" },
                })
            })
            .collect();

        let url = format!("{}/pushes", self.config.repo_url());
        let body = json!({
            "refUpdates": [{
                "name": format!("refs/heads/{branch}"),
                "oldObjectId": tip,
            }],
            "commits": [{
                "comment": message,
                "changes": changes,
            }],
        });
        with_retries(self.retry, "push", || self.post_json(&url, body.clone())).await?;
        info!(branch = %branch, files = files.len(), "files committed");
        Ok(())
    }

    async fn open_pull_request(&self, pr: &NewPullRequest) -> HostResult<PullRequestId> {
        let url = format!("{}/pullrequests", self.config.repo_url());
        let body = json!({
            "sourceRefName": format!("refs/heads/{}", pr.source_branch),
            "targetRefName": format!("refs/heads/{}", pr.target_branch),
            "title": pr.title,
            "description": pr.description,
            "labels": pr.labels.iter().map(|l| json!({"name": l})).collect::<Vec<_>>(),
        });
        let response =
            with_retries(self.retry, "pull request create", || {
                self.post_json(&url, body.clone())
            })
            .await?;
        let created: CreatedPullRequest = response.json().await?;
        info!(pr_id = created.pull_request_id, "pull request opened");
        Ok(PullRequestId(created.pull_request_id))
    }
}
