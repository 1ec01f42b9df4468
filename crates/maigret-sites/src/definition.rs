//! Site definition types and structures.
//!
//! A catalog entry is first deserialized into the loosely typed
//! [`CatalogEntry`] (the on-disk shape), then validated into a [`SiteRule`],
//! whose [`DetectionStrategy`] carries exactly the fields that strategy needs.

use crate::error::ValidationError;
use maigret_core::SiteName;
use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

/// Placeholder replaced by the username in URL templates.
pub const USERNAME_PLACEHOLDER: &str = "{}";

/// Absent-username fixture used when a catalog entry doesn't name one.
pub const DEFAULT_UNCLAIMED_USERNAME: &str = "noonewouldeverusethis7";

/// A value that the catalog writes either as a scalar or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Single value
    One(T),
    /// List of values
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Flatten into a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// One catalog entry as it appears in the JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Detection strategy: `status_code`, `message` or `response_url`
    #[serde(rename = "errorType")]
    pub error_type: String,

    /// Not-found body marker(s) for `message`
    #[serde(rename = "errorMsg", default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<OneOrMany<String>>,

    /// Not-found status code(s) for `status_code`
    #[serde(rename = "errorCode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<OneOrMany<i64>>,

    /// Profile URL template shown to the user
    pub url: String,

    /// Site home page
    #[serde(rename = "urlMain")]
    pub url_main: String,

    /// URL template actually requested, when it differs from `url`
    #[serde(rename = "urlProbe", default, skip_serializing_if = "Option::is_none")]
    pub url_probe: Option<String>,

    /// Redirect target that means "not found" for `response_url`
    #[serde(rename = "errorUrl", default, skip_serializing_if = "Option::is_none")]
    pub error_url: Option<String>,

    /// Username known to exist on the site
    pub username_claimed: String,

    /// Username known not to exist on the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_unclaimed: Option<String>,

    /// Pattern a username must match to possibly exist on the site
    #[serde(rename = "regexCheck", default, skip_serializing_if = "Option::is_none")]
    pub regex_check: Option<String>,
}

/// How a site signals that a profile does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionStrategy {
    /// The response status code identifies missing profiles.
    StatusCode {
        /// Codes meaning "not found"; empty means any status outside 2xx
        not_found_codes: Vec<u16>,
    },

    /// A marker text in the response body identifies missing profiles.
    Message {
        /// Markers meaning "not found"; any one of them is enough
        not_found_messages: Vec<String>,
    },

    /// A redirect to a known page identifies missing profiles.
    ResponseUrl {
        /// Final URL meaning "not found", may contain the `{}` placeholder
        not_found_url: String,
    },
}

impl DetectionStrategy {
    /// Catalog spelling of the strategy.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StatusCode { .. } => "status_code",
            Self::Message { .. } => "message",
            Self::ResponseUrl { .. } => "response_url",
        }
    }
}

/// A validated, ready-to-probe site.
#[derive(Debug, Clone)]
pub struct SiteRule {
    /// Unique site name
    pub name: SiteName,
    /// Site home page
    pub main_url: String,
    /// Profile URL template shown to the user
    pub url_template: String,
    /// URL template requested by the probe
    pub probe_url_template: String,
    /// How absence is detected
    pub strategy: DetectionStrategy,
    /// Username known to exist
    pub known_existing_username: String,
    /// Username known not to exist
    pub known_absent_username: String,
    /// Shape a username must have to exist on the site
    pub username_pattern: Option<Regex>,
}

impl SiteRule {
    /// Validate a catalog entry into a rule.
    pub fn from_entry(name: &str, entry: CatalogEntry) -> Result<Self, ValidationError> {
        let invalid = |reason: String| ValidationError::new(name, reason);

        let site_name = SiteName::new(name).map_err(|e| invalid(e.to_string()))?;

        validate_template("url", &entry.url).map_err(invalid)?;

        let probe_url_template = match entry.url_probe {
            Some(probe) if !probe.trim().is_empty() => {
                validate_template("urlProbe", &probe).map_err(invalid)?;
                probe
            }
            _ => entry.url.clone(),
        };

        if entry.username_claimed.trim().is_empty() {
            return Err(invalid("username_claimed cannot be empty".to_string()));
        }

        let strategy = match entry.error_type.as_str() {
            "status_code" => {
                let mut not_found_codes = Vec::new();
                for code in entry.error_code.map(OneOrMany::into_vec).unwrap_or_default() {
                    match u16::try_from(code) {
                        Ok(code) if (100..=599).contains(&code) => not_found_codes.push(code),
                        _ => {
                            return Err(invalid(format!(
                                "errorCode {code} is not a valid HTTP status"
                            )))
                        }
                    }
                }
                DetectionStrategy::StatusCode { not_found_codes }
            }
            "message" => {
                let not_found_messages: Vec<String> = entry
                    .error_msg
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|msg| !msg.is_empty())
                    .collect();

                if not_found_messages.is_empty() {
                    return Err(invalid(
                        "errorMsg is required for message detection".to_string(),
                    ));
                }
                DetectionStrategy::Message { not_found_messages }
            }
            "response_url" => match entry.error_url {
                Some(not_found_url) if !not_found_url.trim().is_empty() => {
                    DetectionStrategy::ResponseUrl { not_found_url }
                }
                _ => {
                    return Err(invalid(
                        "errorUrl is required for response_url detection".to_string(),
                    ))
                }
            },
            other => return Err(invalid(format!("unsupported errorType '{other}'"))),
        };

        let username_pattern = match entry.regex_check {
            Some(pattern) if !pattern.is_empty() => Some(
                Regex::new(&pattern)
                    .map_err(|e| invalid(format!("regexCheck does not compile: {e}")))?,
            ),
            _ => None,
        };

        let known_absent_username = entry
            .username_unclaimed
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UNCLAIMED_USERNAME.to_string());

        Ok(Self {
            name: site_name,
            main_url: entry.url_main,
            url_template: entry.url,
            probe_url_template,
            strategy,
            known_existing_username: entry.username_claimed,
            known_absent_username,
            username_pattern,
        })
    }

    /// Profile URL for `username`, as presented to the user.
    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        self.url_template.replace(USERNAME_PLACEHOLDER, username)
    }

    /// URL requested when probing `username`.
    #[must_use]
    pub fn probe_url(&self, username: &str) -> String {
        self.probe_url_template
            .replace(USERNAME_PLACEHOLDER, username)
    }

    /// Whether classification needs the response body.
    #[must_use]
    pub fn needs_body(&self) -> bool {
        matches!(self.strategy, DetectionStrategy::Message { .. })
    }

    /// Whether `username` can exist on this site at all.
    ///
    /// A pattern that fails to evaluate (backtrack limit) counts as a
    /// mismatch.
    #[must_use]
    pub fn accepts_username(&self, username: &str) -> bool {
        self.username_pattern
            .as_ref()
            .map_or(true, |pattern| pattern.is_match(username).unwrap_or(false))
    }
}

fn validate_template(field: &str, template: &str) -> Result<(), String> {
    if !template.contains(USERNAME_PLACEHOLDER) {
        return Err(format!("{field} must contain the {USERNAME_PLACEHOLDER} placeholder"));
    }

    let sample = template.replace(USERNAME_PLACEHOLDER, "username");
    let parsed = url::Url::parse(&sample).map_err(|e| format!("{field} is not a valid URL: {e}"))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{field} must use http or https, got {}", parsed.scheme()));
    }

    Ok(())
}
