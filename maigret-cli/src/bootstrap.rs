//! Site catalog download.

use anyhow::{bail, Context, Result};
use maigret_core::CatalogConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Fetches the site catalog from its remote source.
#[derive(Debug, Clone)]
pub struct CatalogBootstrap {
    url: String,
    timeout: Duration,
}

impl CatalogBootstrap {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(
            config.remote_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    /// Download the catalog to `path` if it is missing or `update` is set.
    /// Returns whether a download happened.
    pub async fn ensure(&self, path: &Path, update: bool) -> Result<bool> {
        if !update && path.is_file() {
            debug!(path = %path.display(), "site catalog present");
            return Ok(false);
        }

        self.fetch(path).await?;
        Ok(true)
    }

    /// Download the catalog and replace `path` with it.
    ///
    /// The document is checked to be JSON and written to a sibling temp file
    /// first, so a failed download never clobbers a working catalog.
    pub async fn fetch(&self, path: &Path) -> Result<()> {
        info!(url = %self.url, "downloading site catalog");

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to download site catalog from {}", self.url))?;

        if !response.status().is_success() {
            bail!("Failed to download site catalog: HTTP {}", response.status());
        }

        let contents = response
            .text()
            .await
            .context("Failed to read site catalog response")?;

        serde_json::from_str::<serde_json::Value>(&contents)
            .context("Downloaded site catalog is not valid JSON")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let staging = staging_path(path);
        tokio::fs::write(&staging, &contents)
            .await
            .with_context(|| format!("Failed to write {}", staging.display()))?;
        tokio::fs::rename(&staging, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        info!(path = %path.display(), bytes = contents.len(), "site catalog updated");
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    name.push(".download");
    path.with_file_name(name)
}
