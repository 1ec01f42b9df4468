use std::error::Error as StdError;
use thiserror::Error;

/// Failure of a single probe request.
///
/// These never escape the pipeline: the matcher turns them into an
/// `Unknown` outcome carrying the message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("too many redirects from {url}")]
    Redirect { url: String },

    #[error("invalid probe URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl NetworkError {
    /// Classify a reqwest failure for `url`.
    pub fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        let url = url.to_string();

        if error.is_timeout() {
            Self::Timeout { url }
        } else if error.is_redirect() {
            Self::Redirect { url }
        } else if error.is_builder() {
            Self::InvalidUrl {
                url,
                reason: error_chain(error),
            }
        } else if error.is_connect() {
            Self::Connect {
                url,
                reason: error_chain(error),
            }
        } else if error.is_body() || error.is_decode() {
            Self::Body {
                url,
                reason: error_chain(error),
            }
        } else {
            Self::Request {
                url,
                reason: error_chain(error),
            }
        }
    }

    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Connect { .. } | Self::Request { .. } | Self::Body { .. }
        )
    }
}

/// Errors that stop a run from starting.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("invalid proxy address {address}: {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("concurrency limit must be at least 1")]
    ZeroConcurrency,
}

pub type Result<T> = std::result::Result<T, ProbeError>;

/// Join an error and its sources into one line; reqwest's own message
/// hides the interesting part (DNS, TLS, refused) in the source chain.
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();

    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "connection refused")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    impl StdError for Inner {}

    #[test]
    fn test_error_chain_includes_sources() {
        let err = Outer(Inner);
        assert_eq!(error_chain(&err), "error sending request: connection refused");
    }

    #[test]
    fn test_error_display() {
        let err = NetworkError::Timeout {
            url: "https://example.com/alice".to_string(),
        };
        assert_eq!(err.to_string(), "request to https://example.com/alice timed out");
    }

    #[test]
    fn test_transient_classification() {
        let timeout = NetworkError::Timeout {
            url: "https://example.com".to_string(),
        };
        let redirect = NetworkError::Redirect {
            url: "https://example.com".to_string(),
        };
        let invalid = NetworkError::InvalidUrl {
            url: "https://exa mple.com".to_string(),
            reason: "invalid domain".to_string(),
        };

        assert!(timeout.is_transient());
        assert!(!redirect.is_transient());
        assert!(!invalid.is_transient());
    }
}
