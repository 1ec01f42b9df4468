//! Shared types used across the Maigret workspace.
//!
//! This module defines common newtypes that provide type safety
//! and clear domain modeling.

use crate::error::MaigretError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype for site names as they appear in the catalog.
///
/// The original spelling is preserved for display; lookups go through
/// [`SiteName::lookup_key`], which is case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteName(String);

impl SiteName {
    /// Create a new `SiteName` from a string.
    ///
    /// # Errors
    /// Returns error if the name is empty, padded with whitespace, or
    /// contains control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, MaigretError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive key used for registry lookups.
    #[must_use]
    pub fn lookup_key(&self) -> String {
        Self::key_for(&self.0)
    }

    /// Case-insensitive key for an arbitrary name (e.g. a `--site` argument).
    #[must_use]
    pub fn key_for(name: &str) -> String {
        name.trim().to_lowercase()
    }

    fn validate(name: &str) -> Result<(), MaigretError> {
        if name.is_empty() {
            return Err(MaigretError::Validation(
                "invalid site name: must not be empty".to_string(),
            ));
        }

        if name.trim() != name {
            return Err(MaigretError::Validation(format!(
                "invalid site name: leading or trailing whitespace in '{name}'"
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(MaigretError::Validation(format!(
                "invalid site name: control characters in '{}'",
                name.escape_debug()
            )));
        }

        Ok(())
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for a username being investigated.
///
/// Usernames are substituted verbatim into URL templates and used as a
/// directory name for screenshots and downloads, so they may not be empty,
/// contain whitespace or path separators, or be `.`/`..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create a new `Username` from a string.
    ///
    /// # Errors
    /// Returns error if the username is empty, contains whitespace or a
    /// path separator, or names the current or parent directory.
    pub fn new(username: impl Into<String>) -> Result<Self, MaigretError> {
        let username = username.into();

        if username.is_empty() {
            return Err(MaigretError::Validation(
                "invalid username: must not be empty".to_string(),
            ));
        }

        if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(MaigretError::Validation(format!(
                "invalid username: whitespace or control characters in '{}'",
                username.escape_debug()
            )));
        }

        if username.contains(['/', '\\']) || username == "." || username == ".." {
            return Err(MaigretError::Validation(format!(
                "invalid username: '{username}' is not usable as a directory name"
            )));
        }

        Ok(Self(username))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
