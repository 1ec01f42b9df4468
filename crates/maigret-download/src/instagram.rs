//! Instagram profile picture and timeline media.

use crate::error::{DownloadError, Result};
use crate::registry::{DownloadReport, DownloadRequest, Downloader};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// Registry key for this downloader.
pub const SITE: &str = "instagram";

/// Downloads the profile picture and timeline media of an Instagram user.
#[derive(Debug, Clone)]
pub struct InstagramDownloader {
    client: reqwest::Client,
}

impl InstagramDownloader {
    /// Create a downloader sending `user_agent`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| DownloadError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }

    async fn fetch_profile(&self, profile_url: &str) -> Result<Value> {
        let mut api_url = Url::parse(profile_url).map_err(|e| DownloadError::InvalidUrl {
            url: profile_url.to_string(),
            reason: e.to_string(),
        })?;
        api_url.query_pairs_mut().append_pair("__a", "1");
        let api_url = api_url.to_string();

        let response = self
            .client
            .get(&api_url)
            .send()
            .await
            .map_err(|e| DownloadError::request(&api_url, &e))?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: api_url,
                status: response.status().as_u16(),
            });
        }

        response.json().await.map_err(|e| DownloadError::Parse {
            url: api_url.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Downloader for InstagramDownloader {
    async fn download(&self, request: &DownloadRequest) -> Result<DownloadReport> {
        let profile = self.fetch_profile(&request.profile_url).await?;
        let media = extract_media_urls(&profile);

        let out_dir = output_dir(&request.dir, &request.username);
        tokio::fs::create_dir_all(&out_dir).await?;

        debug!(username = %request.username, count = media.len(), "instagram media found");

        let mut tasks = JoinSet::new();
        for (index, url) in media.into_iter().enumerate() {
            let client = self.client.clone();
            let path = out_dir.join(file_name(index, &url));
            tasks.spawn(async move {
                let saved = save(&client, &url, &path).await;
                (url, saved.map(|()| path))
            });
        }

        let mut report = DownloadReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(path))) => report.files.push(path),
                Ok((url, Err(e))) => {
                    warn!(url = %url, error = %e, "media download failed");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(error = %e, "media download task failed");
                    report.failed += 1;
                }
            }
        }
        report.files.sort();

        info!(
            username = %request.username,
            saved = report.files.len(),
            failed = report.failed,
            "instagram download complete"
        );

        Ok(report)
    }
}

async fn save(client: &reqwest::Client, url: &str, path: &Path) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| DownloadError::request(url, &e))?;

    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| DownloadError::request(url, &e))?;

    tokio::fs::write(path, &bytes).await?;
    debug!(path = %path.display(), "saved media");
    Ok(())
}

/// Media URLs in a profile document: the HD profile picture, then each
/// timeline post. Carousel posts contribute their extra slides; the first
/// slide duplicates the post itself.
#[must_use]
pub fn extract_media_urls(profile: &Value) -> Vec<String> {
    let user = &profile["graphql"]["user"];
    let mut urls = Vec::new();

    if let Some(picture) = user["profile_pic_url_hd"].as_str() {
        urls.push(picture.to_string());
    }

    let edges = user["edge_owner_to_timeline_media"]["edges"]
        .as_array()
        .map_or(&[][..], Vec::as_slice);

    for edge in edges {
        let node = &edge["node"];
        urls.extend(node_media(node));

        if let Some(children) = node["edge_sidecar_to_children"]["edges"].as_array() {
            urls.extend(children.iter().skip(1).filter_map(|child| node_media(&child["node"])));
        }
    }

    urls.retain(|url| !url.is_empty());
    urls
}

fn node_media(node: &Value) -> Option<String> {
    let field = if node["is_video"].as_bool().unwrap_or(false) {
        "video_url"
    } else {
        "display_url"
    };
    node[field].as_str().map(str::to_string)
}

/// `<index>.<extension>` with the extension taken from the URL path.
#[must_use]
pub fn file_name(index: usize, url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();

    let extension = last_segment
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(char::is_alphanumeric))
        .unwrap_or("jpg");

    format!("{index}.{extension}")
}

/// Default output directory for a user's Instagram media.
#[must_use]
pub fn output_dir(root: &Path, username: &str) -> PathBuf {
    root.join(username).join(SITE)
}
