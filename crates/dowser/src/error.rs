//! Error types for the dowser crate.

use thiserror::Error;

/// Result type alias using the dowser error type.
pub type Result<T> = std::result::Result<T, DowserError>;

/// Error type for adaptive client operations.
///
/// Almost everything here is recoverable: transport failures and malformed
/// bodies are absorbed by trying the next candidate, and an exhausted
/// discovery round surfaces to callers as [`AskStatus::Unavailable`] rather
/// than an error. The only fatal condition is invalid static configuration.
///
/// [`AskStatus::Unavailable`]: crate::types::AskStatus::Unavailable
#[derive(Debug, Error)]
pub enum DowserError {
    /// Invalid static configuration (no base URL, zero timeout, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Transport-level failure reaching an endpoint.
    #[error("Unreachable: {0}")]
    Unreachable(String),

    /// 2xx status but the body could not be parsed.
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse {
        /// The endpoint that produced the body.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// Every candidate in a discovery round was exhausted.
    #[error("No working candidate after trying {tried} endpoints")]
    NoWorkingCandidate {
        /// How many candidates were probed this round.
        tried: usize,
    },

    /// Failed to read a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a TOML configuration file.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl DowserError {
    /// Returns true for failures that are expected to clear on their own
    /// (backend still starting, transient network trouble).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::MalformedResponse { .. } | Self::NoWorkingCandidate { .. }
        )
    }

    /// Returns true if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidUrl(_) | Self::Toml(_))
    }
}

impl From<reqwest::Error> for DowserError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DowserError::Unreachable(format!("request timed out: {err}"))
        } else if err.is_connect() {
            DowserError::Unreachable(format!("connection failed: {err}"))
        } else {
            DowserError::Unreachable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient() {
        assert!(DowserError::Unreachable("refused".to_string()).is_transient());
        assert!(DowserError::NoWorkingCandidate { tried: 8 }.is_transient());
        assert!(DowserError::MalformedResponse {
            url: "http://x/y".to_string(),
            reason: "not json".to_string(),
        }
        .is_transient());
        assert!(!DowserError::Config("no base URL".to_string()).is_transient());
    }

    #[test]
    fn test_is_config() {
        assert!(DowserError::Config("bad".to_string()).is_config());
        assert!(!DowserError::Unreachable("refused".to_string()).is_config());
    }

    #[test]
    fn test_display() {
        let err = DowserError::NoWorkingCandidate { tried: 3 };
        assert_eq!(
            err.to_string(),
            "No working candidate after trying 3 endpoints"
        );

        let err = DowserError::MalformedResponse {
            url: "http://localhost:8000/chat".to_string(),
            reason: "expected value".to_string(),
        };
        assert!(err.to_string().contains("http://localhost:8000/chat"));
        assert!(err.to_string().contains("expected value"));
    }
}
