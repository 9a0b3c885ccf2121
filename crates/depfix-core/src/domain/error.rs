//! Domain-level error taxonomy for depfix.

/// depfix domain errors.
///
/// Only run-fatal conditions surface as errors; per-alert problems
/// (extraction misses, validation rejections, limit hits) are normal
/// outcomes carried in the run summary, not errors.
#[derive(Debug, thiserror::Error)]
pub enum DepfixError {
    #[error("alert fetch failed: {0}")]
    FetchFailed(String),

    #[error("host error: {0}")]
    Host(#[from] depfix_hosts::HostError),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for depfix domain operations.
pub type Result<T> = std::result::Result<T, DepfixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failed_display() {
        let err = DepfixError::FetchFailed("503 from alert source".to_string());
        assert!(err.to_string().contains("alert fetch failed"));
    }

    #[test]
    fn digest_mismatch_carries_both_digests() {
        let err = DepfixError::DigestMismatch {
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("def456"));
    }
}
