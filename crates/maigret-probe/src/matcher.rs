//! Classification of completed probes.
//!
//! [`classify`] is a pure function of the rule, the username and the
//! exchange: no I/O, no clock, no shared state.

use crate::error::NetworkError;
use crate::executor::HttpOutcome;
use maigret_sites::definition::USERNAME_PLACEHOLDER;
use maigret_sites::{DetectionStrategy, SiteRule};
use std::fmt;
use url::Url;

/// Verdict for one (username, site) probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The profile exists
    Found,
    /// The site reports the profile missing
    NotFound,
    /// No verdict could be reached
    Unknown,
}

impl Outcome {
    /// Lower-case label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Found => "found",
            Self::NotFound => "not found",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome plus the reason when it is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The verdict
    pub outcome: Outcome,
    /// Why no verdict was reached
    pub error: Option<String>,
}

impl Classification {
    fn found() -> Self {
        Self {
            outcome: Outcome::Found,
            error: None,
        }
    }

    fn not_found() -> Self {
        Self {
            outcome: Outcome::NotFound,
            error: None,
        }
    }

    /// An `Unknown` verdict carrying `reason`.
    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Unknown,
            error: Some(reason.into()),
        }
    }
}

/// Verdict reachable without a request: `NotFound` when `username` does not
/// have the shape the site allows.
#[must_use]
pub fn screen(rule: &SiteRule, username: &str) -> Option<Classification> {
    (!rule.accepts_username(username)).then(Classification::not_found)
}

/// Classify the exchange for `username` against `rule`'s strategy.
///
/// A username rejected by [`screen`] is `NotFound` whatever the exchange.
#[must_use]
pub fn classify(
    rule: &SiteRule,
    username: &str,
    exchange: &Result<HttpOutcome, NetworkError>,
) -> Classification {
    if let Some(verdict) = screen(rule, username) {
        return verdict;
    }

    let response = match exchange {
        Ok(response) => response,
        Err(e) => return Classification::unknown(e.to_string()),
    };

    let missing = match &rule.strategy {
        DetectionStrategy::StatusCode { not_found_codes } => {
            if not_found_codes.is_empty() {
                !(200..300).contains(&response.status)
            } else {
                not_found_codes.contains(&response.status)
            }
        }
        DetectionStrategy::Message { not_found_messages } => not_found_messages
            .iter()
            .any(|message| response.body.contains(message.as_str())),
        DetectionStrategy::ResponseUrl { not_found_url } => {
            let expected = not_found_url.replace(USERNAME_PLACEHOLDER, username);
            same_url(&response.final_url, &expected)
        }
    };

    if missing {
        Classification::not_found()
    } else {
        Classification::found()
    }
}

/// Exact URL comparison that tolerates a trailing `/` and host case.
fn same_url(actual: &str, expected: &str) -> bool {
    match (Url::parse(actual), Url::parse(expected)) {
        (Ok(a), Ok(e)) => {
            a.scheme() == e.scheme()
                && a.host_str() == e.host_str()
                && a.port_or_known_default() == e.port_or_known_default()
                && a.path().trim_end_matches('/') == e.path().trim_end_matches('/')
                && a.query() == e.query()
        }
        _ => actual.trim_end_matches('/') == expected.trim_end_matches('/'),
    }
}
