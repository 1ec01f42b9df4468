//! Local plain-HTTP forwarding proxy in front of an HTTPS origin.
//!
//! The headless browser is pointed at `http://127.0.0.1:<port>/<path>`;
//! the proxy replays each request against the real origin, accepting any
//! certificate, and hands the response back unchanged. One proxy serves a
//! single origin and lives for one capture.

use crate::error::{BrowserError, Result};
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use reqwest::{redirect, Client};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use url::Url;

/// Request bodies larger than this are refused.
const MAX_REQUEST_BODY: usize = 16 * 1024 * 1024;

/// Connection-scoped headers that must not be forwarded.
static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::HOST,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

struct ProxyState {
    client: Client,
    origin: Url,
}

/// A running forwarding proxy.
///
/// Dropping the handle signals shutdown; [`ForwardingProxy::stop`] also
/// waits for the server task to finish.
#[derive(Debug)]
pub struct ForwardingProxy {
    origin: Url,
    port: u16,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ForwardingProxy {
    /// Bind to an ephemeral loopback port and start forwarding to the
    /// origin of `target`.
    pub async fn start(target: &Url) -> Result<Self> {
        let origin = origin_of(target)?;

        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| BrowserError::ProxyError(e.to_string()))?;

        let state = Arc::new(ProxyState {
            client,
            origin: origin.clone(),
        });
        let app = Router::new().fallback(forward).with_state(state);

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let server_origin = origin.clone();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await;

            if let Err(e) = served {
                error!(origin = %server_origin, error = %e, "forwarding proxy failed");
            }
        });

        debug!(origin = %origin, port, "forwarding proxy listening");

        Ok(Self {
            origin,
            port,
            shutdown,
            task: Some(task),
        })
    }

    /// Loopback port the proxy listens on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Origin requests are forwarded to.
    #[must_use]
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Rewrite `original` to go through this proxy, keeping path and query.
    #[must_use]
    pub fn local_url(&self, original: &Url) -> String {
        match original.query() {
            Some(query) => format!("http://127.0.0.1:{}{}?{}", self.port, original.path(), query),
            None => format!("http://127.0.0.1:{}{}", self.port, original.path()),
        }
    }

    /// Shut the proxy down and wait for the server task to exit.
    pub async fn stop(mut self) {
        debug!(origin = %self.origin, port = self.port, "stopping forwarding proxy");
        self.shutdown.cancel();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(origin = %self.origin, error = %e, "forwarding proxy task ended abnormally");
            }
        }
    }
}

impl Drop for ForwardingProxy {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn origin_of(target: &Url) -> Result<Url> {
    if target.host_str().is_none() {
        return Err(BrowserError::InvalidUrl {
            url: target.to_string(),
            reason: "no host".to_string(),
        });
    }

    let mut origin = target.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Ok(origin)
}

async fn forward(State(state): State<Arc<ProxyState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    let mut url = state.origin.clone();
    url.set_path(parts.uri.path());
    url.set_query(parts.uri.query());

    debug!(url = %url, method = %parts.method, "forwarding request");

    let body = match to_bytes(body, MAX_REQUEST_BODY).await {
        Ok(body) => body,
        Err(e) => return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response(),
    };

    let upstream = state
        .client
        .request(parts.method, url.as_str())
        .headers(strip_hop_by_hop(&parts.headers))
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(url = %url, error = %e, "upstream request failed");
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
    };

    let status = upstream.status();
    let headers = strip_hop_by_hop(upstream.headers());

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            warn!(url = %url, error = %e, "failed to read upstream body");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in &HOP_BY_HOP {
        forwarded.remove(name);
    }
    forwarded
}
