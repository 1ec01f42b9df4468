//! Maigret Download - Content downloaders for found profiles.
//!
//! A [`DownloaderRegistry`] maps lower-cased site names to [`Downloader`]
//! implementations. Sites without a downloader are skipped silently.
//!
//! # Example
//!
//! ```rust,no_run
//! use maigret_download::{DownloadRequest, DownloaderRegistry};
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), maigret_download::DownloadError> {
//! let registry = DownloaderRegistry::with_defaults("Mozilla/5.0", Duration::from_secs(30))?;
//! let request = DownloadRequest {
//!     username: "alice".to_string(),
//!     profile_url: "https://www.instagram.com/alice".to_string(),
//!     dir: "downloads".into(),
//! };
//! registry.download("Instagram", &request).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod instagram;
pub mod registry;

use std::sync::Arc;
use std::time::Duration;

pub use error::{DownloadError, Result};
pub use instagram::InstagramDownloader;
pub use registry::{DownloadReport, DownloadRequest, Downloader, DownloaderRegistry};

impl DownloaderRegistry {
    /// Registry with every built-in downloader.
    pub fn with_defaults(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(
            instagram::SITE,
            Arc::new(InstagramDownloader::new(user_agent, timeout)?),
        );
        Ok(registry)
    }
}
