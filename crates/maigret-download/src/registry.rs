//! Downloader registry keyed by site name.

use crate::error::Result;
use async_trait::async_trait;
use maigret_core::SiteName;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// What to download and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Username whose profile was found
    pub username: String,
    /// Profile URL reported by the probe
    pub profile_url: String,
    /// Root download directory
    pub dir: PathBuf,
}

/// Files written by one download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    /// Saved files
    pub files: Vec<PathBuf>,
    /// Media that could not be fetched
    pub failed: usize,
}

/// Fetches the public content of a found profile on one site.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download everything available for `request`.
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadReport>;
}

/// Site name to downloader mapping, case-insensitive.
#[derive(Clone, Default)]
pub struct DownloaderRegistry {
    downloaders: HashMap<String, Arc<dyn Downloader>>,
}

impl DownloaderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `downloader` for `site`, replacing any earlier one.
    pub fn register(&mut self, site: &str, downloader: Arc<dyn Downloader>) {
        debug!(site = %site, "registered downloader");
        self.downloaders.insert(SiteName::key_for(site), downloader);
    }

    /// Whether `site` has a downloader.
    #[must_use]
    pub fn supports(&self, site: &str) -> bool {
        self.downloaders.contains_key(&SiteName::key_for(site))
    }

    /// Registered site keys, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.downloaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered downloaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.downloaders.len()
    }

    /// Whether no downloader is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.downloaders.is_empty()
    }

    /// Run the downloader for `site`. Returns `None` if there is none.
    pub async fn download(
        &self,
        site: &str,
        request: &DownloadRequest,
    ) -> Result<Option<DownloadReport>> {
        let Some(downloader) = self.downloaders.get(&SiteName::key_for(site)) else {
            debug!(site = %site, "no downloader for site");
            return Ok(None);
        };

        info!(site = %site, username = %request.username, "downloading profile content");
        downloader.download(request).await.map(Some)
    }
}

impl std::fmt::Debug for DownloaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloaderRegistry")
            .field("sites", &self.names())
            .finish()
    }
}
