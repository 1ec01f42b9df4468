//! Maigret Sites - Site catalog system for username probing.
//!
//! This crate loads the catalog of per-site detection rules, validates each
//! entry into a strongly typed [`SiteRule`], and exposes the result as an
//! immutable [`SiteRegistry`].
//!
//! # Architecture
//!
//! - **Definition Types** ([`definition`]): Catalog entries and validated site rules
//! - **Loader** ([`loader`]): JSON catalog loading with per-entry validation
//! - **Registry** ([`registry`]): Immutable, case-insensitive lookup with single-site filtering
//! - **Errors** ([`error`]): Catalog-level and per-entry error types
//!
//! # Example
//!
//! ```rust
//! use maigret_sites::CatalogLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = r#"{
//!     "GitHub": {
//!         "errorType": "status_code",
//!         "url": "https://github.com/{}",
//!         "urlMain": "https://github.com/",
//!         "username_claimed": "octocat"
//!     }
//! }"#;
//!
//! let report = CatalogLoader::parse("inline", catalog)?;
//! let github = report.registry.filter("github")?;
//! assert_eq!(github.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export commonly used types
pub use definition::{CatalogEntry, DetectionStrategy, OneOrMany, SiteRule};
pub use error::{RegistryError, Result, ValidationError};
pub use loader::{CatalogLoader, LoadReport};
pub use registry::SiteRegistry;
