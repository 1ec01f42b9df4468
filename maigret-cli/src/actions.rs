//! Follow-up work for found profiles.

use async_trait::async_trait;
use maigret_browser::ScreenshotCapture;
use maigret_download::{DownloadRequest, DownloaderRegistry};
use maigret_probe::{FoundHandler, ProbeResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Screenshots and content downloads for every found profile.
///
/// Failures are logged and never change the probe result.
#[derive(Default)]
pub struct FoundActions {
    screenshots: Option<Arc<ScreenshotCapture>>,
    downloads: Option<(Arc<DownloaderRegistry>, PathBuf)>,
}

impl FoundActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_screenshots(mut self, capture: Arc<ScreenshotCapture>) -> Self {
        self.screenshots = Some(capture);
        self
    }

    pub fn with_downloads(mut self, registry: Arc<DownloaderRegistry>, dir: PathBuf) -> Self {
        self.downloads = Some((registry, dir));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.screenshots.is_none() && self.downloads.is_none()
    }
}

#[async_trait]
impl FoundHandler for FoundActions {
    async fn on_found(&self, result: &ProbeResult) {
        if let Some(capture) = &self.screenshots {
            match capture.capture(&result.username, &result.url).await {
                Ok(path) => info!(site = %result.site, path = %path.display(), "screenshot saved"),
                Err(e) => warn!(site = %result.site, url = %result.url, error = %e, "screenshot failed"),
            }
        }

        if let Some((registry, dir)) = &self.downloads {
            let request = DownloadRequest {
                username: result.username.clone(),
                profile_url: result.url.clone(),
                dir: dir.clone(),
            };

            match registry.download(result.site.as_str(), &request).await {
                Ok(Some(report)) => info!(
                    site = %result.site,
                    files = report.files.len(),
                    failed = report.failed,
                    "profile content downloaded"
                ),
                Ok(None) => {}
                Err(e) => warn!(site = %result.site, error = %e, "download failed"),
            }
        }
    }
}
