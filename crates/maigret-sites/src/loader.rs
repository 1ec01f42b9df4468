//! Site catalog loading from a JSON document.
//!
//! The catalog is a JSON object mapping site name to entry. Entries that
//! fail validation are skipped and reported; only an unreadable or
//! structurally broken document fails the load.

use crate::{
    definition::{CatalogEntry, SiteRule},
    error::{RegistryError, Result, ValidationError},
    registry::SiteRegistry,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Outcome of a catalog load: the usable registry plus rejected entries.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// Registry built from every valid entry
    pub registry: SiteRegistry,
    /// Entries that were excluded, with reasons
    pub rejected: Vec<ValidationError>,
}

/// Loader for the site catalog file.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    /// Path to the catalog JSON
    path: PathBuf,
}

impl CatalogLoader {
    /// Create a new loader for the given catalog path.
    ///
    /// # Errors
    /// Returns error if the file doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if !path.is_file() {
            return Err(RegistryError::NotFound {
                path: path.display().to_string(),
            });
        }

        Ok(Self { path })
    }

    /// Path of the catalog this loader reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the catalog.
    ///
    /// # Errors
    /// Returns error if the file can't be read, isn't JSON, or isn't a
    /// JSON object. Invalid entries are reported in the [`LoadReport`].
    pub fn load(&self) -> Result<LoadReport> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RegistryError::NotFound {
                    path: self.path.display().to_string(),
                }
            } else {
                RegistryError::LoadError {
                    path: self.path.display().to_string(),
                    source: e,
                }
            }
        })?;

        let report = Self::parse(&self.path.display().to_string(), &contents)?;

        info!(
            count = report.registry.len(),
            rejected = report.rejected.len(),
            path = %self.path.display(),
            "loaded site catalog"
        );

        Ok(report)
    }

    /// Parse catalog contents. `origin` only labels errors.
    pub fn parse(origin: &str, contents: &str) -> Result<LoadReport> {
        let document: Value =
            serde_json::from_str(contents).map_err(|e| RegistryError::ParseError {
                path: origin.to_string(),
                source: e,
            })?;

        let entries = match document {
            Value::Object(entries) => entries,
            other => {
                return Err(RegistryError::SchemaError {
                    path: origin.to_string(),
                    reason: format!(
                        "expected an object mapping site names to entries, found {}",
                        json_kind(&other)
                    ),
                })
            }
        };

        let mut rules = Vec::with_capacity(entries.len());
        let mut rejected = Vec::new();

        for (name, raw) in entries {
            // `$schema` and friends describe the document, not a site
            if name.starts_with('$') {
                debug!(key = %name, "skipping catalog metadata key");
                continue;
            }

            let validated = serde_json::from_value::<CatalogEntry>(raw)
                .map_err(|e| ValidationError::new(name.as_str(), format!("malformed entry: {e}")))
                .and_then(|entry| SiteRule::from_entry(&name, entry));

            match validated {
                Ok(rule) => rules.push(rule),
                Err(e) => rejected.push(e),
            }
        }

        let (registry, duplicates) = SiteRegistry::from_rules(rules);
        rejected.extend(duplicates);

        for error in &rejected {
            warn!(
                site = %error.site,
                reason = %error.reason,
                "skipping invalid site entry"
            );
        }

        Ok(LoadReport { registry, rejected })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DetectionStrategy;
    use tempfile::TempDir;

    const CATALOG: &str = r#"{
        "$schema": "data.schema.json",
        "GitHub": {
            "errorType": "status_code",
            "errorCode": 404,
            "url": "https://github.com/{}",
            "urlMain": "https://github.com/",
            "username_claimed": "octocat",
            "username_unclaimed": "noonewouldeverusethis7"
        },
        "Forum": {
            "errorType": "message",
            "errorMsg": "Page not found",
            "url": "https://forum.example/u/{}",
            "urlMain": "https://forum.example/",
            "username_claimed": "admin"
        },
        "Redirector": {
            "errorType": "response_url",
            "errorUrl": "https://r.example/404",
            "url": "https://r.example/{}",
            "urlMain": "https://r.example/",
            "username_claimed": "admin"
        }
    }"#;

    fn write_catalog(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("data.json");
        std::fs::write(&path, contents).expect("write catalog");
        path
    }

    #[test]
    fn test_loader_new_with_missing_file() {
        let result = CatalogLoader::new("/nonexistent/path/to/data.json");
        assert!(matches!(result, Err(RegistryError::NotFound { .. })));
    }

    #[test]
    fn test_load_valid_catalog() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = write_catalog(temp_dir.path(), CATALOG);

        let report = CatalogLoader::new(&path)
            .expect("create loader")
            .load()
            .expect("load catalog");

        assert!(report.rejected.is_empty());
        assert_eq!(report.registry.len(), 3);
        assert!(!report.registry.contains("$schema"));

        let github = report.registry.get("github").expect("github present");
        assert_eq!(
            github.strategy,
            DetectionStrategy::StatusCode {
                not_found_codes: vec![404]
            }
        );
    }

    #[test]
    fn test_one_invalid_entry_among_valid_ones() {
        let catalog = r#"{
            "Good1": {
                "errorType": "status_code",
                "url": "https://one.example/{}",
                "urlMain": "https://one.example/",
                "username_claimed": "a"
            },
            "Broken": {
                "errorType": "message",
                "url": "https://broken.example/{}",
                "urlMain": "https://broken.example/",
                "username_claimed": "a"
            },
            "Good2": {
                "errorType": "status_code",
                "url": "https://two.example/{}",
                "urlMain": "https://two.example/",
                "username_claimed": "a"
            }
        }"#;

        let report = CatalogLoader::parse("inline", catalog).expect("catalog loads");
        assert_eq!(report.registry.len(), 2);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].site, "Broken");
    }

    #[test]
    fn test_structurally_malformed_entry_is_not_fatal() {
        let catalog = r#"{
            "Good": {
                "errorType": "status_code",
                "url": "https://good.example/{}",
                "urlMain": "https://good.example/",
                "username_claimed": "a"
            },
            "NotAnObject": 42,
            "MissingUrl": {
                "errorType": "status_code",
                "urlMain": "https://x.example/",
                "username_claimed": "a"
            }
        }"#;

        let report = CatalogLoader::parse("inline", catalog).expect("catalog loads");
        assert_eq!(report.registry.len(), 1);
        assert_eq!(report.rejected.len(), 2);
        assert!(report
            .rejected
            .iter()
            .all(|e| e.reason.starts_with("malformed entry")));
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let result = CatalogLoader::parse("inline", "{ not json [[[");
        assert!(matches!(result, Err(RegistryError::ParseError { .. })));
    }

    #[test]
    fn test_non_object_document_is_schema_error() {
        let result = CatalogLoader::parse("inline", "[1, 2, 3]");
        match result {
            Err(RegistryError::SchemaError { reason, .. }) => assert!(reason.contains("array")),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_catalog_order_is_kept() {
        let catalog = r#"{
            "Zeta": {
                "errorType": "status_code",
                "url": "https://zeta.example/{}",
                "urlMain": "https://zeta.example/",
                "username_claimed": "a"
            },
            "Alpha": {
                "errorType": "status_code",
                "url": "https://alpha.example/{}",
                "urlMain": "https://alpha.example/",
                "username_claimed": "a"
            },
            "Mu": {
                "errorType": "status_code",
                "url": "https://mu.example/{}",
                "urlMain": "https://mu.example/",
                "username_claimed": "a"
            },
            "zeta": {
                "errorType": "status_code",
                "url": "https://zeta2.example/{}",
                "urlMain": "https://zeta2.example/",
                "username_claimed": "a"
            }
        }"#;

        let report = CatalogLoader::parse("inline", catalog).expect("catalog loads");
        let names: Vec<&str> = report.registry.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Mu"]);

        // The later spelling loses to the one written first
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].site, "zeta");
    }

    #[test]
    fn test_look_around_regex_check_loads() {
        let catalog = r#"{
            "Dotted": {
                "errorType": "status_code",
                "url": "https://dotted.example/{}",
                "urlMain": "https://dotted.example/",
                "username_claimed": "blue.bird",
                "regexCheck": "^(?![.-])[a-zA-Z0-9_.-]{3,20}$"
            }
        }"#;

        let report = CatalogLoader::parse("inline", catalog).expect("catalog loads");
        assert!(report.rejected.is_empty(), "rejected: {:?}", report.rejected);

        let rule = report.registry.get("dotted").expect("site kept");
        assert!(rule.accepts_username("blue.bird"));
        assert!(!rule.accepts_username(".bird"));
    }

    #[test]
    fn test_empty_catalog() {
        let report = CatalogLoader::parse("inline", "{}").expect("empty catalog loads");
        assert!(report.registry.is_empty());
        assert!(report.rejected.is_empty());
    }
}
