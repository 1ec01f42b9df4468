//! Catalog self-validation.
//!
//! Every site declares one username that exists and one that does not.
//! Probing both must yield `Found` and `NotFound` respectively; anything
//! else marks the site's rule as out of date.

use crate::dispatcher::panic_message;
use crate::error::{ProbeError, Result};
use crate::executor::ProbeExecutor;
use crate::matcher::{Classification, Outcome};
use futures::FutureExt;
use maigret_core::SiteName;
use maigret_sites::{SiteRegistry, SiteRule};
use std::panic::AssertUnwindSafe;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Self-test verdicts for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCheck {
    /// Site under test
    pub site: SiteName,
    /// Verdict for the known existing username
    pub claimed: Classification,
    /// Verdict for the known absent username
    pub unclaimed: Classification,
}

impl SiteCheck {
    /// Whether both fixtures classified as expected.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.claimed.outcome == Outcome::Found && self.unclaimed.outcome == Outcome::NotFound
    }

    /// Human-readable description of what went wrong, if anything.
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        let mut problems = Vec::new();

        if self.claimed.outcome != Outcome::Found {
            problems.push(describe("existing", &self.claimed, Outcome::Found));
        }
        if self.unclaimed.outcome != Outcome::NotFound {
            problems.push(describe("absent", &self.unclaimed, Outcome::NotFound));
        }

        if problems.is_empty() {
            None
        } else {
            Some(problems.join("; "))
        }
    }
}

fn describe(fixture: &str, got: &Classification, expected: Outcome) -> String {
    match &got.error {
        Some(error) => format!("{fixture} username: expected {expected}, got {} ({error})", got.outcome),
        None => format!("{fixture} username: expected {expected}, got {}", got.outcome),
    }
}

/// Result of a full self-test run, in registry order.
#[derive(Debug, Clone, Default)]
pub struct SelfTestReport {
    /// One check per site
    pub checks: Vec<SiteCheck>,
}

impl SelfTestReport {
    /// Checks that did not pass.
    pub fn failures(&self) -> impl Iterator<Item = &SiteCheck> {
        self.checks.iter().filter(|check| !check.passed())
    }

    /// Number of sites whose rules no longer match the site.
    #[must_use]
    pub fn incompatible_count(&self) -> usize {
        self.failures().count()
    }
}

/// Runs the self-validation probes under a concurrency bound.
#[derive(Debug, Clone)]
pub struct SelfTest {
    executor: ProbeExecutor,
    concurrency_limit: usize,
}

impl SelfTest {
    /// Create a self-test runner.
    pub fn new(executor: ProbeExecutor, concurrency_limit: usize) -> Result<Self> {
        if concurrency_limit == 0 {
            return Err(ProbeError::ZeroConcurrency);
        }

        Ok(Self {
            executor,
            concurrency_limit,
        })
    }

    /// Check every site in `registry`. Failures are reported, never fatal.
    pub async fn run(&self, registry: &SiteRegistry) -> SelfTestReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();
        let mut pending = BTreeMap::new();

        for (position, rule) in registry.iter().enumerate() {
            pending.insert(position, Arc::clone(rule));

            let rule = Arc::clone(rule);
            let executor = self.executor.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let check = match semaphore.acquire_owned().await {
                    Ok(_permit) => check_site(&executor, &rule).await,
                    Err(e) => unknown_check(&rule, &e.to_string()),
                };
                (position, check)
            });
        }

        let mut checks = Vec::with_capacity(registry.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, check)) => {
                    pending.remove(&position);
                    checks.push((position, check));
                }
                Err(e) => warn!(error = %e, "self-test task failed to join"),
            }
        }

        for (position, rule) in pending {
            warn!(site = %rule.name, "self-test task lost; reporting site as unknown");
            checks.push((position, unknown_check(&rule, "self-test task aborted")));
        }
        checks.sort_by_key(|(position, _)| *position);

        let report = SelfTestReport {
            checks: checks.into_iter().map(|(_, check)| check).collect(),
        };

        for check in report.failures() {
            warn!(
                site = %check.site,
                reason = %check.failure().unwrap_or_default(),
                "site failed self-test"
            );
        }
        info!(
            sites = report.checks.len(),
            incompatible = report.incompatible_count(),
            "self-test complete"
        );

        report
    }
}

fn unknown_check(rule: &SiteRule, reason: &str) -> SiteCheck {
    SiteCheck {
        site: rule.name.clone(),
        claimed: Classification::unknown(reason),
        unclaimed: Classification::unknown(reason),
    }
}

async fn check_site(executor: &ProbeExecutor, rule: &SiteRule) -> SiteCheck {
    let claimed = probe_fixture(executor, rule, &rule.known_existing_username).await;
    let unclaimed = probe_fixture(executor, rule, &rule.known_absent_username).await;

    SiteCheck {
        site: rule.name.clone(),
        claimed,
        unclaimed,
    }
}

async fn probe_fixture(executor: &ProbeExecutor, rule: &SiteRule, username: &str) -> Classification {
    match AssertUnwindSafe(executor.check(username, rule)).catch_unwind().await {
        Ok(classification) => classification,
        Err(panic) => Classification::unknown(format!("probe panicked: {}", panic_message(&*panic))),
    }
}
