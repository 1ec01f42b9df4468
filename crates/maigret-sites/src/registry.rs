//! Immutable in-memory site registry with case-insensitive lookup.

use crate::{
    definition::SiteRule,
    error::{RegistryError, Result, ValidationError},
};
use maigret_core::SiteName;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Validated site rules, indexed by lower-cased name.
///
/// The registry is built once and never mutated afterwards, so it can be
/// shared between probe tasks behind an `Arc` without locking. Iteration
/// order is the order in which rules were added.
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    rules: Vec<Arc<SiteRule>>,
    index: HashMap<String, usize>,
}

impl SiteRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from validated rules.
    ///
    /// A rule whose name collides (case-insensitively) with an earlier one
    /// is rejected and reported instead of replacing it.
    pub fn from_rules(rules: impl IntoIterator<Item = SiteRule>) -> (Self, Vec<ValidationError>) {
        let mut registry = Self::new();
        let mut rejected = Vec::new();

        for rule in rules {
            let key = rule.name.lookup_key();
            if let Some(&existing) = registry.index.get(&key) {
                rejected.push(ValidationError::new(
                    rule.name.as_str(),
                    format!(
                        "duplicate site name (already defined as {})",
                        registry.rules[existing].name
                    ),
                ));
                continue;
            }

            registry.index.insert(key, registry.rules.len());
            registry.rules.push(Arc::new(rule));
        }

        (registry, rejected)
    }

    /// Look up a site by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<SiteRule>> {
        self.index
            .get(&SiteName::key_for(name))
            .map(|&position| &self.rules[position])
    }

    /// Check if a site exists in the registry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&SiteName::key_for(name))
    }

    /// Iterate over all rules.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SiteRule>> {
        self.rules.iter()
    }

    /// Get all site names in registry order.
    #[must_use]
    pub fn names(&self) -> Vec<&SiteName> {
        self.rules.iter().map(|rule| &rule.name).collect()
    }

    /// Get the total number of sites in the registry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the registry holds no sites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Narrow the registry to the single site called `name`.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownSite`] if no site matches.
    pub fn filter(&self, name: &str) -> Result<Self> {
        let rule = self.get(name).ok_or_else(|| RegistryError::UnknownSite {
            name: name.to_string(),
        })?;

        debug!(site = %rule.name, "filtered registry to a single site");

        let mut index = HashMap::with_capacity(1);
        index.insert(rule.name.lookup_key(), 0);

        Ok(Self {
            rules: vec![Arc::clone(rule)],
            index,
        })
    }

    /// Apply an optional single-site filter.
    pub fn select(&self, name: Option<&str>) -> Result<Self> {
        match name {
            Some(name) => self.filter(name),
            None => Ok(self.clone()),
        }
    }
}

impl<'a> IntoIterator for &'a SiteRegistry {
    type Item = &'a Arc<SiteRule>;
    type IntoIter = std::slice::Iter<'a, Arc<SiteRule>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
