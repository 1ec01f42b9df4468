//! Maigret Core - Foundation crate for the Maigret username scanner.
//!
//! This crate provides the shared types, error handling and configuration
//! management that the registry, probe engine and CLI depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes (`SiteName`, `Username`)
//!
//! # Example
//!
//! ```rust
//! use maigret_core::{AppConfig, TransportConfig};
//!
//! let config = AppConfig::default();
//! let transport = TransportConfig::from_app_config(&config, false, false);
//! assert_eq!(transport.concurrency_limit, 32);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, CatalogConfig, DownloadConfig, ProbingConfig, ProxyConfig, ScreenshotConfig,
    TransportConfig,
};
pub use error::{ConfigError, ConfigResult, MaigretError};
pub use types::{SiteName, Username};
