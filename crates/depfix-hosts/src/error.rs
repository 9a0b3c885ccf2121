//! Error taxonomy for external collaborators.

/// Errors produced by the alert source, VCS host, or dependency resolver.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("missing required environment variables: {}", vars.join(", "))]
    MissingEnv { vars: Vec<String> },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("authentication rejected by remote host")]
    Auth,

    #[error("{tool} failed: {stderr}")]
    CommandFailed { tool: String, stderr: String },

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Whether a retry may succeed. Network faults and 5xx responses are
    /// transient; auth failures, 4xx responses, and malformed payloads
    /// are not.
    pub fn is_transient(&self) -> bool {
        match self {
            HostError::Http(e) => e.is_connect() || e.is_timeout(),
            HostError::Status { code, .. } => *code >= 500,
            HostError::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Result type for host operations.
pub type HostResult<T> = std::result::Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = HostError::Status {
            code: 503,
            body: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = HostError::Status {
            code: 404,
            body: "not found".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!HostError::Auth.is_transient());
    }

    #[test]
    fn missing_env_lists_all_vars() {
        let err = HostError::MissingEnv {
            vars: vec!["DEVOPS_TOKEN".to_string(), "DEVOPS_PROJECT".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("DEVOPS_TOKEN"));
        assert!(msg.contains("DEVOPS_PROJECT"));
    }
}
