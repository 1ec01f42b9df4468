use maigret_download::{DownloadError, DownloadRequest, DownloaderRegistry};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry() -> DownloaderRegistry {
    DownloaderRegistry::with_defaults("TestAgent/1.0", Duration::from_secs(5))
        .expect("registry builds")
}

#[tokio::test]
async fn test_instagram_download_saves_media() {
    let server = MockServer::start().await;
    let uri = server.uri();

    let profile = serde_json::json!({
        "graphql": { "user": {
            "profile_pic_url_hd": format!("{uri}/media/pic.jpg"),
            "edge_owner_to_timeline_media": { "edges": [
                { "node": { "is_video": true, "video_url": format!("{uri}/media/clip.mp4") } },
                { "node": { "is_video": false, "display_url": format!("{uri}/media/gone.jpg") } }
            ] }
        } }
    });

    Mock::given(method("GET"))
        .and(path("/alice"))
        .and(query_param("__a", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/pic.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg bytes".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/clip.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4 bytes".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/media/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("create temp dir");
    let request = DownloadRequest {
        username: "alice".to_string(),
        profile_url: format!("{uri}/alice"),
        dir: temp_dir.path().to_path_buf(),
    };

    let report = registry()
        .download("Instagram", &request)
        .await
        .expect("download succeeds")
        .expect("instagram has a downloader");

    let out_dir = temp_dir.path().join("alice").join("instagram");
    assert_eq!(report.files, vec![out_dir.join("0.jpg"), out_dir.join("1.mp4")]);
    assert_eq!(report.failed, 1);
    assert_eq!(
        std::fs::read(out_dir.join("0.jpg")).expect("picture saved"),
        b"jpeg bytes"
    );
}

#[tokio::test]
async fn test_instagram_profile_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("create temp dir");
    let request = DownloadRequest {
        username: "private".to_string(),
        profile_url: format!("{}/private", server.uri()),
        dir: temp_dir.path().to_path_buf(),
    };

    let result = registry().download("instagram", &request).await;
    assert!(matches!(result, Err(DownloadError::Status { status: 429, .. })));
}

#[test]
fn test_default_registry_lists_instagram() {
    assert_eq!(registry().names(), vec!["instagram"]);
}
