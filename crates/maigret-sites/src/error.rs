//! Error types for the site catalog subsystem.

use thiserror::Error;

/// Errors that prevent a catalog from being used at all.
///
/// These are fatal to startup: no probing happens when the catalog
/// cannot be read.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Catalog file does not exist
    #[error("site catalog not found at {path}")]
    NotFound {
        /// Expected catalog path
        path: String,
    },

    /// Catalog file exists but could not be read
    #[error("failed to read site catalog from {path}: {source}")]
    LoadError {
        /// Catalog path
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Catalog is not valid JSON
    #[error("failed to parse site catalog JSON in {path}: {source}")]
    ParseError {
        /// Catalog path
        path: String,
        /// JSON parse error
        #[source]
        source: serde_json::Error,
    },

    /// Catalog is valid JSON but not a mapping of site name to entry
    #[error("site catalog {path} has an invalid layout: {reason}")]
    SchemaError {
        /// Catalog path
        path: String,
        /// What was wrong with the document
        reason: String,
    },

    /// Single-site filter named a site the catalog does not contain
    #[error("unknown site: {name}")]
    UnknownSite {
        /// Name as given by the user
        name: String,
    },
}

/// A single catalog entry that was rejected during load.
///
/// Rejected entries are reported and excluded; the rest of the
/// catalog is still usable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid site entry {site}: {reason}")]
pub struct ValidationError {
    /// Site name as written in the catalog
    pub site: String,
    /// Reason for rejection
    pub reason: String,
}

impl ValidationError {
    /// Build a validation error for `site`.
    pub fn new(site: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
