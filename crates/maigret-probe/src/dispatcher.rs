//! Bounded-concurrency probe dispatch.
//!
//! Usernames are processed one after another. For each username every site
//! gets its own task; a shared semaphore caps how many of them hold a
//! network slot at once, and all of them are joined before the next
//! username starts.

use crate::aggregator::{ProbeEvent, ProbeResult, ResultAggregator};
use crate::error::{ProbeError, Result};
use crate::executor::ProbeExecutor;
use crate::matcher::Outcome;
use async_trait::async_trait;
use futures::FutureExt;
use maigret_core::Username;
use maigret_sites::{SiteRegistry, SiteRule};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Hook run for every `Found` result while the probe still holds its
/// concurrency permit.
#[async_trait]
pub trait FoundHandler: Send + Sync {
    /// Called once per found profile.
    async fn on_found(&self, result: &ProbeResult);
}

/// Shared state for one run: the permit pool and the result sink.
#[derive(Debug, Clone)]
pub struct RunContext {
    semaphore: Arc<Semaphore>,
    aggregator: Arc<ResultAggregator>,
}

impl RunContext {
    /// Context with `concurrency_limit` permits.
    #[must_use]
    pub fn new(concurrency_limit: usize, aggregator: Arc<ResultAggregator>) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit)),
            aggregator,
        }
    }

    /// The result sink.
    #[must_use]
    pub fn aggregator(&self) -> &Arc<ResultAggregator> {
        &self.aggregator
    }
}

/// Fans (username, site) pairs out to the executor and matcher.
pub struct ProbeDispatcher {
    executor: ProbeExecutor,
    concurrency_limit: usize,
    found_handler: Option<Arc<dyn FoundHandler>>,
}

impl ProbeDispatcher {
    /// Create a dispatcher.
    ///
    /// # Errors
    /// Returns [`ProbeError::ZeroConcurrency`] if `concurrency_limit` is 0.
    pub fn new(executor: ProbeExecutor, concurrency_limit: usize) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(ProbeError::ZeroConcurrency);
        }

        Ok(Self {
            executor,
            concurrency_limit,
            found_handler: None,
        })
    }

    /// Attach a hook for found profiles.
    #[must_use]
    pub fn with_found_handler(mut self, handler: Arc<dyn FoundHandler>) -> Self {
        self.found_handler = Some(handler);
        self
    }

    /// Maximum number of probes in flight.
    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Probe every username against every site in `registry`.
    ///
    /// Each pair yields exactly one result, recorded in `aggregator` as it
    /// completes and returned here in completion order per username.
    pub async fn run_batch(
        &self,
        usernames: &[Username],
        registry: &SiteRegistry,
        aggregator: Arc<ResultAggregator>,
    ) -> Vec<ProbeResult> {
        let context = RunContext::new(self.concurrency_limit, aggregator);
        let mut results = Vec::with_capacity(usernames.len() * registry.len());

        for username in usernames {
            results.extend(self.run_username(username, registry, &context).await);
        }

        results
    }

    async fn run_username(
        &self,
        username: &Username,
        registry: &SiteRegistry,
        context: &RunContext,
    ) -> Vec<ProbeResult> {
        let started = Instant::now();
        let before = context.aggregator.snapshot();

        context.aggregator.emit(ProbeEvent::UsernameStarted {
            username: username.to_string(),
            sites: registry.len(),
        });
        info!(username = %username, sites = registry.len(), "probing username");

        let mut tasks = JoinSet::new();
        let mut pending: HashMap<String, Arc<SiteRule>> = HashMap::with_capacity(registry.len());

        for rule in registry {
            pending.insert(rule.name.lookup_key(), Arc::clone(rule));

            let rule = Arc::clone(rule);
            let username = username.as_str().to_string();
            let executor = self.executor.clone();
            let context = context.clone();
            let handler = self.found_handler.clone();

            tasks.spawn(probe_site(executor, context, handler, username, rule));
        }

        let mut results = Vec::with_capacity(registry.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    pending.remove(&result.site.lookup_key());
                    results.push(result);
                }
                Err(e) => error!(username = %username, error = %e, "probe task failed to join"),
            }
        }

        // Tasks that never reported still owe a result
        for rule in pending.into_values() {
            let result = unknown_result(
                username.as_str(),
                &rule,
                self.executor.proxied(),
                "probe task aborted".to_string(),
                Duration::ZERO,
            );
            context.aggregator.record(result.clone());
            results.push(result);
        }

        let counters = context.aggregator.snapshot().since(before);
        let elapsed = started.elapsed();

        info!(
            username = %username,
            found = counters.found,
            checked = counters.checked,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "finished username"
        );
        context.aggregator.emit(ProbeEvent::UsernameFinished {
            username: username.to_string(),
            counters,
            elapsed,
        });

        results
    }
}

impl std::fmt::Debug for ProbeDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeDispatcher")
            .field("executor", &self.executor)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("found_handler", &self.found_handler.is_some())
            .finish()
    }
}

async fn probe_site(
    executor: ProbeExecutor,
    context: RunContext,
    handler: Option<Arc<dyn FoundHandler>>,
    username: String,
    rule: Arc<SiteRule>,
) -> ProbeResult {
    let started = Instant::now();
    let proxied = executor.proxied();

    let _permit = match Arc::clone(&context.semaphore).acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => {
            let result = unknown_result(&username, &rule, proxied, e.to_string(), started.elapsed());
            context.aggregator.record(result.clone());
            return result;
        }
    };

    let probe = executor.check(&username, &rule);

    let result = match AssertUnwindSafe(probe).catch_unwind().await {
        Ok(classification) => ProbeResult {
            username: username.clone(),
            site: rule.name.clone(),
            url: rule.profile_url(&username),
            outcome: classification.outcome,
            proxied,
            error: classification.error,
            elapsed: started.elapsed(),
        },
        Err(panic) => {
            let reason = format!("probe panicked: {}", panic_message(&*panic));
            warn!(site = %rule.name, username = %username, reason = %reason, "probe task panicked");
            unknown_result(&username, &rule, proxied, reason, started.elapsed())
        }
    };

    debug!(
        site = %rule.name,
        username = %username,
        outcome = %result.outcome,
        "probe complete"
    );
    context.aggregator.record(result.clone());

    if result.outcome == Outcome::Found {
        if let Some(handler) = handler {
            if AssertUnwindSafe(handler.on_found(&result))
                .catch_unwind()
                .await
                .is_err()
            {
                warn!(site = %rule.name, username = %username, "found handler panicked");
            }
        }
    }

    result
}

fn unknown_result(
    username: &str,
    rule: &SiteRule,
    proxied: bool,
    reason: String,
    elapsed: Duration,
) -> ProbeResult {
    ProbeResult {
        username: username.to_string(),
        site: rule.name.clone(),
        url: rule.profile_url(username),
        outcome: Outcome::Unknown,
        proxied,
        error: Some(reason),
        elapsed,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
