//! Maigret Probe - Username probe engine.
//!
//! This crate checks a username against every site of a
//! [`SiteRegistry`](maigret_sites::SiteRegistry). Each (username, site) pair
//! becomes one HTTP exchange, classified by the site's detection strategy.
//!
//! # Features
//!
//! - Bounded concurrency through a shared semaphore
//! - Direct or SOCKS5-proxied transport
//! - Retry of transient network failures with linear backoff
//! - Panicking or failing probes degrade to `Unknown`, never abort a run
//! - Live result events for presenters
//! - Self-validation of catalog rules against their fixture usernames
//!
//! # Example
//!
//! ```rust,no_run
//! use maigret_core::{TransportConfig, Username};
//! use maigret_probe::{ProbeDispatcher, ProbeExecutor, ResultAggregator};
//! use maigret_sites::CatalogLoader;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let report = CatalogLoader::new("data.json")?.load()?;
//! let transport = TransportConfig::default();
//!
//! let dispatcher = ProbeDispatcher::new(
//!     ProbeExecutor::new(&transport)?,
//!     transport.concurrency_limit,
//! )?;
//!
//! let aggregator = Arc::new(ResultAggregator::new());
//! let usernames = vec![Username::new("octocat")?];
//! let results = dispatcher
//!     .run_batch(&usernames, &report.registry, Arc::clone(&aggregator))
//!     .await;
//!
//! println!("{} found", results.iter().filter(|r| r.is_found()).count());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod aggregator;
pub mod dispatcher;
#[allow(missing_docs)]
pub mod error;
pub mod executor;
pub mod matcher;
pub mod selftest;

// Re-export commonly used types
pub use aggregator::{ProbeEvent, ProbeResult, ResultAggregator, RunCounters};
pub use dispatcher::{FoundHandler, ProbeDispatcher, RunContext};
pub use error::{NetworkError, ProbeError, Result};
pub use executor::{HttpClient, HttpFetch, HttpOutcome, ProbeExecutor, ProbeRequest};
pub use matcher::{classify, screen, Classification, Outcome};
pub use selftest::{SelfTest, SelfTestReport, SiteCheck};
