use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation to {url} failed: {reason}")]
    NavigationError { url: String, reason: String },

    #[error("screenshot of {url} failed: {reason}")]
    CaptureError { url: String, reason: String },

    #[error("timeout after {secs}s: {url}")]
    Timeout { url: String, secs: u64 },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("forwarding proxy error: {0}")]
    ProxyError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
