//! Result aggregation and live event delivery.

use crate::matcher::Outcome;
use maigret_core::SiteName;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

/// Final record of one (username, site) probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Username that was probed
    pub username: String,
    /// Site that was probed
    pub site: SiteName,
    /// Profile URL shown to the user
    pub url: String,
    /// Verdict
    pub outcome: Outcome,
    /// Whether the request went through the anonymizing proxy
    pub proxied: bool,
    /// Reason for an `Unknown` verdict
    pub error: Option<String>,
    /// Wall time spent on the probe, retries included
    pub elapsed: Duration,
}

impl ProbeResult {
    /// Whether the profile was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        self.outcome == Outcome::Found
    }
}

/// Run-level counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    /// Probes completed
    pub checked: u64,
    /// Probes with a `Found` verdict
    pub found: u64,
}

impl RunCounters {
    /// Counts accumulated since `earlier`.
    #[must_use]
    pub fn since(self, earlier: Self) -> Self {
        Self {
            checked: self.checked.saturating_sub(earlier.checked),
            found: self.found.saturating_sub(earlier.found),
        }
    }
}

/// Progress notifications for the presenter.
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    /// Probing of a username is about to start
    UsernameStarted {
        /// The username
        username: String,
        /// Number of sites that will be probed
        sites: usize,
    },
    /// One probe completed
    Result(ProbeResult),
    /// Every probe for a username completed
    UsernameFinished {
        /// The username
        username: String,
        /// Counters for this username only
        counters: RunCounters,
        /// Wall time for the username
        elapsed: Duration,
    },
}

/// Thread-safe sink for probe results.
///
/// Counters are atomics; results are kept in arrival order. When built with
/// [`ResultAggregator::with_events`] every record is also forwarded to a
/// single consumer so output lines are never interleaved.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    checked: AtomicU64,
    found: AtomicU64,
    results: Mutex<Vec<ProbeResult>>,
    events: Option<mpsc::UnboundedSender<ProbeEvent>>,
}

impl ResultAggregator {
    /// Aggregator without live delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator that also streams events to the returned receiver.
    #[must_use]
    pub fn with_events() -> (Self, mpsc::UnboundedReceiver<ProbeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let aggregator = Self {
            events: Some(tx),
            ..Self::default()
        };
        (aggregator, rx)
    }

    /// Record one completed probe.
    pub fn record(&self, result: ProbeResult) {
        self.checked.fetch_add(1, Ordering::SeqCst);
        if result.is_found() {
            self.found.fetch_add(1, Ordering::SeqCst);
        }

        self.emit(ProbeEvent::Result(result.clone()));

        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    /// Forward an event to the consumer, if any.
    ///
    /// A dropped receiver is not an error: the run carries on without a
    /// presenter.
    pub fn emit(&self, event: ProbeEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                tracing::trace!("event receiver dropped");
            }
        }
    }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> RunCounters {
        RunCounters {
            checked: self.checked.load(Ordering::SeqCst),
            found: self.found.load(Ordering::SeqCst),
        }
    }

    /// Copy of every recorded result.
    #[must_use]
    pub fn results(&self) -> Vec<ProbeResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded results, leaving the counters untouched.
    pub fn take_results(&self) -> Vec<ProbeResult> {
        std::mem::take(
            &mut *self
                .results
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}
