use crate::error::{BrowserError, Result};
use crate::proxy::ForwardingProxy;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use maigret_core::ScreenshotConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// Grace period after navigation for late-loading content.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Screenshot settings resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Root directory; files land in `<dir>/<username>/<host>.png`
    pub dir: PathBuf,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// User agent sent by the browser
    pub user_agent: String,
    /// Upper bound for one capture, navigation included
    pub timeout: Duration,
    /// Explicit Chrome/Chromium executable
    pub chrome_path: Option<PathBuf>,
}

impl CaptureSettings {
    /// Settings from the screenshot config section and the probe user agent.
    #[must_use]
    pub fn from_config(config: &ScreenshotConfig, user_agent: &str) -> Self {
        Self {
            dir: config.dir.clone(),
            window_width: config.window_width,
            window_height: config.window_height,
            user_agent: user_agent.to_string(),
            timeout: Duration::from_secs(config.navigation_timeout_secs),
            chrome_path: config.chrome_path.clone(),
        }
    }
}

/// Where the screenshot of `url` for `username` is stored.
pub fn screenshot_path(dir: &Path, username: &str, url: &Url) -> PathBuf {
    let host = url.host_str().unwrap_or("unknown");
    dir.join(username).join(format!("{host}.png"))
}

/// Headless browser that captures profile pages.
///
/// The browser process is launched once and shared by every capture; each
/// capture opens its own tab.
pub struct ScreenshotCapture {
    browser: Mutex<Browser>,
    handler: JoinHandle<()>,
    settings: CaptureSettings,
}

impl ScreenshotCapture {
    /// Launch the headless browser.
    pub async fn launch(settings: CaptureSettings) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(settings.window_width, settings.window_height)
            .arg(format!("--user-agent={}", settings.user_agent))
            .arg("--hide-scrollbars")
            .arg("--disable-gpu")
            .arg("--disable-crash-reporter")
            .arg("--allow-insecure-localhost");

        if let Some(path) = &settings.chrome_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler event error");
                }
            }
        });

        info!(
            width = settings.window_width,
            height = settings.window_height,
            "headless browser launched"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            handler,
            settings,
        })
    }

    /// Capture `url` and save it under the username's directory.
    ///
    /// HTTPS pages are loaded through a local [`ForwardingProxy`] so that
    /// certificate problems don't block the capture.
    pub async fn capture(&self, username: &str, url: &str) -> Result<PathBuf> {
        let target = Url::parse(url).map_err(|e| BrowserError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let destination = screenshot_path(&self.settings.dir, username, &target);
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let proxy = if target.scheme() == "https" {
            Some(ForwardingProxy::start(&target).await?)
        } else {
            None
        };
        let navigate_to = proxy
            .as_ref()
            .map_or_else(|| target.to_string(), |proxy| proxy.local_url(&target));

        let secs = self.settings.timeout.as_secs();
        let captured = tokio::time::timeout(self.settings.timeout, self.render(&navigate_to, url)).await;

        if let Some(proxy) = proxy {
            proxy.stop().await;
        }

        let png = match captured {
            Ok(result) => result?,
            Err(_) => {
                return Err(BrowserError::Timeout {
                    url: url.to_string(),
                    secs,
                })
            }
        };

        tokio::fs::write(&destination, png).await?;
        info!(url = %url, path = %destination.display(), "screenshot saved");

        Ok(destination)
    }

    async fn render(&self, navigate_to: &str, url: &str) -> Result<Vec<u8>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page(navigate_to)
                .await
                .map_err(|e| BrowserError::NavigationError {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?
        };

        page.wait_for_navigation()
            .await
            .map_err(|e| BrowserError::NavigationError {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        tokio::time::sleep(SETTLE_DELAY).await;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(false)
            .build();

        let png = page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::CaptureError {
                url: url.to_string(),
                reason: e.to_string(),
            });

        if let Err(e) = page.close().await {
            debug!(url = %url, error = %e, "failed to close tab");
        }

        png
    }

    /// Close the browser and wait for its event loop to finish.
    pub async fn shutdown(self) {
        let mut browser = self.browser.into_inner();
        if let Err(e) = browser.close().await {
            warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        if let Err(e) = self.handler.await {
            debug!(error = %e, "browser handler task ended abnormally");
        }
    }
}

impl std::fmt::Debug for ScreenshotCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreenshotCapture")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
