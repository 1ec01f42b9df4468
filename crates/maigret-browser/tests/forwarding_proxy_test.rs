use maigret_browser::ForwardingProxy;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .build()
        .expect("client builds")
}

#[tokio::test]
async fn test_proxy_forwards_path_query_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/alice"))
        .and(query_param("tab", "repositories"))
        .and(header("x-requested-by", "maigret"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<h1>alice</h1>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let target = Url::parse(&format!("{}/users/alice?tab=repositories", server.uri()))
        .expect("valid url");
    let proxy = ForwardingProxy::start(&target).await.expect("proxy starts");

    let local = proxy.local_url(&target);
    assert_eq!(
        local,
        format!("http://127.0.0.1:{}/users/alice?tab=repositories", proxy.port())
    );

    let response = client()
        .get(&local)
        .header("x-requested-by", "maigret")
        .send()
        .await
        .expect("request through proxy");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/html")
    );
    assert_eq!(response.text().await.expect("body"), "<h1>alice</h1>");

    proxy.stop().await;
}

#[tokio::test]
async fn test_proxy_passes_status_through() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;

    let target = Url::parse(&format!("{}/missing", server.uri())).expect("valid url");
    let proxy = ForwardingProxy::start(&target).await.expect("proxy starts");

    let response = client()
        .get(proxy.local_url(&target))
        .send()
        .await
        .expect("request through proxy");
    assert_eq!(response.status(), 404);

    proxy.stop().await;
}

#[tokio::test]
async fn test_stopped_proxy_refuses_connections() {
    let server = MockServer::start().await;

    let target = Url::parse(&server.uri()).expect("valid url");
    let proxy = ForwardingProxy::start(&target).await.expect("proxy starts");
    let local = proxy.local_url(&target);

    proxy.stop().await;

    assert!(client().get(&local).send().await.is_err());
}

#[tokio::test]
async fn test_unreachable_origin_is_bad_gateway() {
    let target = Url::parse("http://127.0.0.1:9/profile").expect("valid url");
    let proxy = ForwardingProxy::start(&target).await.expect("proxy starts");

    let response = client()
        .get(proxy.local_url(&target))
        .send()
        .await
        .expect("proxy answers");
    assert_eq!(response.status(), 502);

    proxy.stop().await;
}
