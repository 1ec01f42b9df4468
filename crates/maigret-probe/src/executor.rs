//! Probe executor: one HTTP exchange per (username, site) pair.
//!
//! The network sits behind the [`HttpFetch`] trait so the dispatcher and
//! self-test can run against fakes. [`HttpClient`] is the reqwest-backed
//! implementation, either direct or routed through a SOCKS5 proxy.

use crate::error::{NetworkError, ProbeError, Result};
use crate::matcher::{classify, screen, Classification};
use async_trait::async_trait;
use maigret_core::TransportConfig;
use maigret_sites::SiteRule;
use reqwest::{redirect, Client, Proxy};
use std::sync::Arc;
use std::time::Duration;

/// Base delay in milliseconds between retry attempts.
pub const RETRY_DELAY_MS: u64 = 100;

/// Response bodies are truncated past this size.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// What the probe asks the transport for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Fully substituted probe URL
    pub url: String,
    /// Whether the matcher needs the body
    pub read_body: bool,
}

/// A completed HTTP exchange, reduced to what the matcher looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOutcome {
    /// Final status code
    pub status: u16,
    /// URL after following redirects
    pub final_url: String,
    /// Body as lossy UTF-8; empty when not requested
    pub body: String,
}

/// Transport used by the executor.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Perform one request.
    async fn fetch(&self, request: &ProbeRequest) -> std::result::Result<HttpOutcome, NetworkError>;

    /// Whether requests leave through the anonymizing proxy.
    fn is_proxied(&self) -> bool;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    proxied: bool,
}

impl HttpClient {
    /// Build the client described by `transport`.
    ///
    /// # Errors
    /// Returns error if the proxy address is malformed or the TLS backend
    /// can't be initialised.
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(transport.user_agent.as_str())
            .timeout(transport.request_timeout)
            .connect_timeout(transport.request_timeout.min(Duration::from_secs(5)))
            .redirect(redirect::Policy::limited(transport.max_redirects))
            .pool_idle_timeout(Duration::from_secs(90));

        if transport.use_anonymizing_proxy {
            let proxy =
                Proxy::all(&transport.proxy_address).map_err(|source| ProbeError::InvalidProxy {
                    address: transport.proxy_address.clone(),
                    source,
                })?;
            builder = builder.proxy(proxy);
            tracing::debug!(proxy = %transport.proxy_address, "routing probes through SOCKS5 proxy");
        } else {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(ProbeError::ClientBuild)?;

        Ok(Self {
            client,
            proxied: transport.use_anonymizing_proxy,
        })
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn fetch(&self, request: &ProbeRequest) -> std::result::Result<HttpOutcome, NetworkError> {
        let mut response = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(&request.url, &e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut body = Vec::new();
        if request.read_body {
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|e| NetworkError::from_reqwest(&request.url, &e))?
            {
                let room = MAX_BODY_BYTES - body.len();
                if chunk.len() >= room {
                    body.extend_from_slice(&chunk[..room]);
                    tracing::debug!(url = %request.url, "response body truncated");
                    break;
                }
                body.extend_from_slice(&chunk);
            }
        }

        Ok(HttpOutcome {
            status,
            final_url,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    fn is_proxied(&self) -> bool {
        self.proxied
    }
}

/// Runs probes for site rules over an [`HttpFetch`] transport.
#[derive(Clone)]
pub struct ProbeExecutor {
    fetcher: Arc<dyn HttpFetch>,
    max_retries: u32,
    retry_delay: Duration,
}

impl ProbeExecutor {
    /// Create an executor with the reqwest transport for `transport`.
    pub fn new(transport: &TransportConfig) -> Result<Self> {
        let client = HttpClient::new(transport)?;
        Ok(Self::with_fetcher(Arc::new(client)).with_retries(transport.max_retries))
    }

    /// Create an executor over an arbitrary transport, without retries.
    #[must_use]
    pub fn with_fetcher(fetcher: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetcher,
            max_retries: 0,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }

    /// Set the number of extra attempts for transient network errors.
    #[must_use]
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay between attempts.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Whether probes leave through the anonymizing proxy.
    #[must_use]
    pub fn proxied(&self) -> bool {
        self.fetcher.is_proxied()
    }

    /// Probe and classify `username` on `rule`.
    ///
    /// Usernames the site's pattern rejects are `NotFound` without a request.
    pub async fn check(&self, username: &str, rule: &SiteRule) -> Classification {
        if let Some(verdict) = screen(rule, username) {
            tracing::debug!(site = %rule.name, username = %username, "username rejected by site pattern");
            return verdict;
        }

        let exchange = self.execute(username, rule).await;
        classify(rule, username, &exchange)
    }

    /// Probe `rule` for `username`.
    ///
    /// Transient network errors are retried with a linearly growing delay;
    /// the last error is returned once attempts run out.
    pub async fn execute(
        &self,
        username: &str,
        rule: &SiteRule,
    ) -> std::result::Result<HttpOutcome, NetworkError> {
        let request = ProbeRequest {
            url: rule.probe_url(username),
            read_body: rule.needs_body(),
        };

        let mut attempt = 0;
        loop {
            match self.fetcher.fetch(&request).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.retry_delay * attempt;

                    tracing::warn!(
                        site = %rule.name,
                        error = %e,
                        "probe failed (attempt {}/{}), retrying in {:?}",
                        attempt,
                        self.max_retries + 1,
                        delay
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for ProbeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeExecutor")
            .field("proxied", &self.proxied())
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maigret_core::SiteName;
    use maigret_sites::DetectionStrategy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Fails with `failures` timeouts before answering 200.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    #[async_trait]
    impl HttpFetch for Flaky {
        async fn fetch(
            &self,
            request: &ProbeRequest,
        ) -> std::result::Result<HttpOutcome, NetworkError> {
            self.seen.lock().expect("lock").push(request.clone());
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(NetworkError::Timeout {
                    url: request.url.clone(),
                });
            }
            Ok(HttpOutcome {
                status: 200,
                final_url: request.url.clone(),
                body: String::new(),
            })
        }

        fn is_proxied(&self) -> bool {
            true
        }
    }

    fn flaky(failures: u32) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn rule(strategy: DetectionStrategy) -> SiteRule {
        SiteRule {
            name: SiteName::new("Example").expect("valid site name"),
            main_url: "https://example.com/".to_string(),
            url_template: "https://example.com/{}".to_string(),
            probe_url_template: "https://api.example.com/users/{}".to_string(),
            strategy,
            known_existing_username: "alice".to_string(),
            known_absent_username: "nobody".to_string(),
            username_pattern: None,
        }
    }

    #[tokio::test]
    async fn test_execute_builds_probe_request() {
        let fetcher = flaky(0);
        let executor = ProbeExecutor::with_fetcher(fetcher.clone());

        let rule = rule(DetectionStrategy::Message {
            not_found_messages: vec!["missing".to_string()],
        });
        let outcome = executor.execute("bob", &rule).await.expect("probe succeeds");

        assert_eq!(outcome.status, 200);
        let seen = fetcher.seen.lock().expect("lock");
        assert_eq!(
            seen[0],
            ProbeRequest {
                url: "https://api.example.com/users/bob".to_string(),
                read_body: true,
            }
        );
        assert!(executor.proxied());
    }

    #[tokio::test]
    async fn test_check_skips_request_for_rejected_username() {
        let fetcher = flaky(0);
        let executor = ProbeExecutor::with_fetcher(fetcher.clone());

        let mut rule = rule(DetectionStrategy::StatusCode {
            not_found_codes: vec![404],
        });
        rule.username_pattern =
            Some(fancy_regex::Regex::new("^[a-zA-Z0-9_]{1,15}$").expect("valid regex"));

        let rejected = executor.check("not/a/name", &rule).await;
        assert_eq!(rejected.outcome, crate::Outcome::NotFound);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        let accepted = executor.check("blue", &rule).await;
        assert_eq!(accepted.outcome, crate::Outcome::Found);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_execute_retries_transient_errors() {
        let fetcher = flaky(2);
        let executor = ProbeExecutor::with_fetcher(fetcher.clone())
            .with_retries(2)
            .with_retry_delay(Duration::from_millis(1));

        let rule = rule(DetectionStrategy::StatusCode {
            not_found_codes: vec![404],
        });
        let result = executor.execute("bob", &rule).await;

        assert!(result.is_ok());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        assert!(!fetcher.seen.lock().expect("lock")[0].read_body);
    }

    #[tokio::test]
    async fn test_execute_gives_up_after_retries() {
        let fetcher = flaky(10);
        let executor = ProbeExecutor::with_fetcher(fetcher.clone())
            .with_retries(1)
            .with_retry_delay(Duration::from_millis(1));

        let rule = rule(DetectionStrategy::StatusCode {
            not_found_codes: vec![404],
        });
        let result = executor.execute("bob", &rule).await;

        assert!(matches!(result, Err(NetworkError::Timeout { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_http_client_rejects_bad_proxy() {
        let transport = TransportConfig {
            use_anonymizing_proxy: true,
            proxy_address: "not a proxy url".to_string(),
            ..TransportConfig::default()
        };

        assert!(matches!(
            HttpClient::new(&transport),
            Err(ProbeError::InvalidProxy { .. })
        ));
    }

    #[test]
    fn test_http_client_proxied_flag() {
        let direct = HttpClient::new(&TransportConfig::default()).expect("direct client");
        assert!(!direct.is_proxied());

        let transport = TransportConfig {
            use_anonymizing_proxy: true,
            ..TransportConfig::default()
        };
        let proxied = HttpClient::new(&transport).expect("socks client");
        assert!(proxied.is_proxied());
    }
}
