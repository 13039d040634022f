// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Immutable Service-to-names registry.
//!
//! The registry maps each watched Kubernetes Service to the ordered list
//! of fully-qualified names it should receive in the hosts file. It is
//! built exactly once at startup from the `--map` flags and the `--domain`
//! suffix, then shared read-only (behind an `Arc`) by the event watcher
//! and the shutdown cleanup pass. Nothing mutates it afterwards, so no
//! synchronization is needed.

use crate::config::ServiceMapping;
use std::collections::BTreeMap;
use tracing::info;

/// Derive the fully-qualified name for one prefix.
///
/// An empty prefix yields the bare domain suffix; anything else is joined
/// with a dot.
///
/// ```rust
/// use devhosts::registry::domain_entry;
///
/// assert_eq!(domain_entry("", "example.com"), "example.com");
/// assert_eq!(domain_entry("docs", "example.com"), "docs.example.com");
/// ```
#[must_use]
pub fn domain_entry(prefix: &str, domain: &str) -> String {
    if prefix.is_empty() {
        domain.to_string()
    } else {
        format!("{prefix}.{domain}")
    }
}

/// Static mapping from Service name to derived hosts-file names.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: BTreeMap<String, Vec<String>>,
}

impl ServiceRegistry {
    /// Build the registry from parsed `--map` values and the domain suffix.
    ///
    /// Logs every derived entry so a developer can see at startup exactly
    /// which names the process will manage. A service listed twice keeps
    /// the last mapping.
    #[must_use]
    pub fn from_mappings(mappings: &[ServiceMapping], domain: &str) -> Self {
        let mut entries = BTreeMap::new();

        for mapping in mappings {
            let names: Vec<String> = mapping
                .prefixes
                .iter()
                .map(|prefix| domain_entry(prefix, domain))
                .collect();

            info!(
                service = %mapping.service,
                entries = %names.join(", "),
                "registered hosts entries"
            );
            entries.insert(mapping.service.clone(), names);
        }

        Self { entries }
    }

    /// The derived names for a Service, or `None` if it is not tracked.
    #[must_use]
    pub fn names_for(&self, service: &str) -> Option<&[String]> {
        self.entries.get(service).map(Vec::as_slice)
    }

    /// Whether this Service is tracked at all.
    #[must_use]
    pub fn contains(&self, service: &str) -> bool {
        self.entries.contains_key(service)
    }

    /// Every name the registry could ever bind, across all services.
    ///
    /// Used by the cleanup pass, which removes the full union rather than
    /// tracking which names were actually added during the run.
    #[must_use]
    pub fn all_names(&self) -> Vec<String> {
        self.entries.values().flatten().cloned().collect()
    }

    /// Number of tracked services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no services are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
