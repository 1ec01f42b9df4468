//! End-to-end probe tests against a local HTTP fixture server.

use maigret_core::{TransportConfig, Username};
use maigret_probe::{
    Outcome, ProbeDispatcher, ProbeExecutor, ResultAggregator, SelfTest,
};
use maigret_sites::{CatalogLoader, SiteRegistry};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport() -> TransportConfig {
    TransportConfig {
        request_timeout: Duration::from_millis(500),
        max_retries: 0,
        ..TransportConfig::default()
    }
}

fn registry(catalog: &str) -> SiteRegistry {
    let report = CatalogLoader::parse("test", catalog).expect("catalog parses");
    assert!(report.rejected.is_empty(), "rejected: {:?}", report.rejected);
    report.registry
}

async fn probe_one(registry: &SiteRegistry, username: &str) -> maigret_probe::ProbeResult {
    let dispatcher =
        ProbeDispatcher::new(ProbeExecutor::new(&transport()).expect("client builds"), 4)
            .expect("non-zero limit");
    let usernames = vec![Username::new(username).expect("valid username")];

    let mut results = dispatcher
        .run_batch(&usernames, registry, Arc::new(ResultAggregator::new()))
        .await;
    assert_eq!(results.len(), 1);
    results.remove(0)
}

#[tokio::test]
async fn test_status_code_found_and_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<h1>alice</h1>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/nobody"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "GitHub": {{
                "errorType": "status_code",
                "errorCode": 404,
                "url": "{uri}/{{}}",
                "urlMain": "{uri}/",
                "username_claimed": "alice"
            }}
        }}"#,
        uri = server.uri()
    ));

    let found = probe_one(&registry, "alice").await;
    assert_eq!(found.outcome, Outcome::Found);
    assert_eq!(found.url, format!("{}/alice", server.uri()));
    assert!(!found.proxied);
    assert!(found.error.is_none());

    let missing = probe_one(&registry, "nobody").await;
    assert_eq!(missing.outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_message_detection() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/u/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Welcome to alice's page"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/u/bob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<p>The specified member cannot be found</p>"),
        )
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Forum": {{
                "errorType": "message",
                "errorMsg": ["The specified member cannot be found", "Account suspended"],
                "url": "{uri}/u/{{}}",
                "urlMain": "{uri}/",
                "username_claimed": "alice"
            }}
        }}"#,
        uri = server.uri()
    ));

    assert_eq!(probe_one(&registry, "alice").await.outcome, Outcome::Found);
    assert_eq!(probe_one(&registry, "bob").await.outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_response_url_follows_redirect() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bob"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/404", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/404"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not here"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(200).set_body_string("alice"))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Redirector": {{
                "errorType": "response_url",
                "errorUrl": "{uri}/404",
                "url": "{uri}/{{}}",
                "urlMain": "{uri}/",
                "username_claimed": "alice"
            }}
        }}"#,
        uri = server.uri()
    ));

    assert_eq!(probe_one(&registry, "alice").await.outcome, Outcome::Found);
    assert_eq!(probe_one(&registry, "bob").await.outcome, Outcome::NotFound);
}

#[tokio::test]
async fn test_probe_url_and_username_pattern() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users/blue"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html>blue's profile</html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    // A malformed name never reaches the site
    Mock::given(method("GET"))
        .and(path("/api/users/not.valid"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Api": {{
                "errorType": "status_code",
                "url": "{uri}/profile/{{}}",
                "urlProbe": "{uri}/api/users/{{}}",
                "urlMain": "{uri}/",
                "regexCheck": "^[a-zA-Z0-9_]{{1,15}}$",
                "username_claimed": "blue"
            }}
        }}"#,
        uri = server.uri()
    ));

    let found = probe_one(&registry, "blue").await;
    assert_eq!(found.outcome, Outcome::Found);
    assert!(found.error.is_none());
    // The displayed URL comes from `url`, not the probe URL
    assert_eq!(found.url, format!("{}/profile/blue", server.uri()));

    let rejected = probe_one(&registry, "not.valid").await;
    assert_eq!(rejected.outcome, Outcome::NotFound);

    server.verify().await;
}

#[tokio::test]
async fn test_self_test_passes_pattern_checked_site() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/u/blue"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/u/noonewouldeverusethis7"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Patterned": {{
                "errorType": "status_code",
                "url": "{uri}/u/{{}}",
                "urlMain": "{uri}/",
                "regexCheck": "^(?![.-])[a-zA-Z0-9_.-]{{3,25}}$",
                "username_claimed": "blue"
            }}
        }}"#,
        uri = server.uri()
    ));

    let self_test = SelfTest::new(ProbeExecutor::new(&transport()).expect("client builds"), 4)
        .expect("non-zero limit");
    let report = self_test.run(&registry).await;

    assert_eq!(report.checks.len(), 1);
    assert!(report.checks[0].passed(), "{:?}", report.checks[0].failure());
}

#[tokio::test]
async fn test_timeout_is_unknown_with_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Slow": {{
                "errorType": "status_code",
                "url": "{uri}/{{}}",
                "urlMain": "{uri}/",
                "username_claimed": "slow"
            }}
        }}"#,
        uri = server.uri()
    ));

    let result = probe_one(&registry, "slow").await;
    assert_eq!(result.outcome, Outcome::Unknown);
    assert!(result
        .error
        .as_deref()
        .is_some_and(|e| e.contains("timed out")));
}

#[tokio::test]
async fn test_unreachable_site_does_not_affect_siblings() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/alice"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Up": {{
                "errorType": "status_code",
                "url": "{uri}/{{}}",
                "urlMain": "{uri}/",
                "username_claimed": "alice"
            }},
            "Down": {{
                "errorType": "status_code",
                "url": "http://127.0.0.1:9/{{}}",
                "urlMain": "http://127.0.0.1:9/",
                "username_claimed": "alice"
            }}
        }}"#,
        uri = server.uri()
    ));

    let dispatcher =
        ProbeDispatcher::new(ProbeExecutor::new(&transport()).expect("client builds"), 2)
            .expect("non-zero limit");
    let aggregator = Arc::new(ResultAggregator::new());
    let results = dispatcher
        .run_batch(
            &[Username::new("alice").expect("valid username")],
            &registry,
            Arc::clone(&aggregator),
        )
        .await;

    assert_eq!(results.len(), 2);
    for result in &results {
        match result.site.as_str() {
            "Up" => assert_eq!(result.outcome, Outcome::Found),
            "Down" => {
                assert_eq!(result.outcome, Outcome::Unknown);
                assert!(result.error.is_some());
            }
            other => panic!("unexpected site {other}"),
        }
    }
    assert_eq!(aggregator.snapshot().found, 1);
}

#[tokio::test]
async fn test_self_test_flags_broken_rules() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/good/alice"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/good/noonewouldeverusethis7"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    // A site that answers 200 for everything can't be probed by status
    Mock::given(method("GET"))
        .and(path("/soft404/alice"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/soft404/noonewouldeverusethis7"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let registry = registry(&format!(
        r#"{{
            "Good": {{
                "errorType": "status_code",
                "url": "{uri}/good/{{}}",
                "urlMain": "{uri}/good/",
                "username_claimed": "alice"
            }},
            "Soft404": {{
                "errorType": "status_code",
                "url": "{uri}/soft404/{{}}",
                "urlMain": "{uri}/soft404/",
                "username_claimed": "alice"
            }}
        }}"#,
        uri = server.uri()
    ));

    let self_test = SelfTest::new(ProbeExecutor::new(&transport()).expect("client builds"), 4)
        .expect("non-zero limit");
    let report = self_test.run(&registry).await;

    assert_eq!(report.checks.len(), 2);
    assert_eq!(report.incompatible_count(), 1);

    let failed: Vec<_> = report.failures().collect();
    assert_eq!(failed[0].site.as_str(), "Soft404");
    assert!(failed[0]
        .failure()
        .is_some_and(|f| f.contains("absent username")));
}
