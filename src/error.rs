//! Error types for adapter boundaries and per-file processing.
//!
//! Fallible application code uses `anyhow`; these enums exist where callers
//! need to branch on the failure (retryable or not) or aggregate diagnostics
//! without parsing log text.

use thiserror::Error;

/// Failure reported by a [`ContentFetcher`](crate::fetcher::ContentFetcher).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("rate limited while fetching {0}")]
    RateLimited(String),

    #[error("HTTP {status} for {path}: {message}")]
    Http {
        status: u16,
        path: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("malformed response for {path}: {message}")]
    Decode { path: String, message: String },
}

impl FetchError {
    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::RateLimited(_) | FetchError::Network(_) => true,
            FetchError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Why a single file produced no entries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileFailure {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("decode failed: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(FetchError::RateLimited("src".into()).is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
        assert!(FetchError::Http {
            status: 502,
            path: "src".into(),
            message: String::new()
        }
        .is_retryable());
        assert!(!FetchError::Http {
            status: 400,
            path: "src".into(),
            message: String::new()
        }
        .is_retryable());
        assert!(!FetchError::NotFound("src".into()).is_retryable());
        assert!(!FetchError::AccessDenied("src".into()).is_retryable());
    }

    #[test]
    fn file_failure_wraps_fetch_error() {
        let failure: FileFailure = FetchError::NotFound("a.ts".into()).into();
        assert_eq!(failure.to_string(), "fetch failed: path not found: a.ts");
    }
}
