//! Error types for Parley.
//!
//! None of these ever reach the chat user: the resolver degrades every
//! failure to a less specific reply. They surface only at construction time
//! (bad config, bad pattern) and inside the remote fallback path.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Remote backend error: {0}")]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures of the remote fallback call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Remote backend is disabled in configuration")]
    Disabled,

    #[error("Quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Remote backend returned empty response")]
    EmptyResponse,
}

impl RemoteError {
    /// Whether the backend told us we ran out of quota.
    ///
    /// Only these failures drive the exponential backoff; everything else
    /// counts towards the consecutive-failure breaker.
    pub fn is_quota(&self) -> bool {
        matches!(self, RemoteError::QuotaExhausted(_))
    }

    /// Classify a raw HTTP status/body pair the way quota-limited APIs report it
    pub fn from_http(status: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        if status == 429 || body.contains("RESOURCE_EXHAUSTED") || lowered.contains("quota") {
            RemoteError::QuotaExhausted(format!("HTTP {}", status))
        } else {
            RemoteError::Http(format!("HTTP {}", status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_classification() {
        assert!(RemoteError::from_http(429, "").is_quota());
        assert!(RemoteError::from_http(400, "{\"status\":\"RESOURCE_EXHAUSTED\"}").is_quota());
        assert!(RemoteError::from_http(403, "Daily Quota exceeded").is_quota());
        assert!(!RemoteError::from_http(500, "internal").is_quota());
        assert!(!RemoteError::Timeout(20).is_quota());
    }

    #[test]
    fn test_error_display() {
        let err = ParleyError::Config("bad offset".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad offset");

        let err: ParleyError = RemoteError::EmptyResponse.into();
        assert!(err.to_string().contains("empty response"));
    }
}
