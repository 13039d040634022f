// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Devhosts - Kubernetes `LoadBalancer` to hosts-file synchronizer
//!
//! Devhosts watches the Services in one Kubernetes namespace and keeps the
//! local hosts file in sync with their externally reachable `LoadBalancer`
//! addresses, so that cluster-internal service names resolve on a
//! developer's workstation to whatever address the cluster currently
//! assigns them.
//!
//! ## Overview
//!
//! Three units joined by a bounded channel:
//!
//! - [`registry`] - immutable mapping from Service name to the
//!   fully-qualified names it should receive, built once at startup
//! - [`watch`] - consumes the Kubernetes watch stream, filters to
//!   registered Services, and emits resolved address updates
//! - [`sync`] - applies each address update to the hosts file:
//!   remove stale bindings, add the new one, save
//!
//! The binary brackets the run with a hosts-file backup at startup and a
//! cleanup pass on exit (signal, worker error, or stream closure) that
//! removes every name this process could have added.
//!
//! ## Example
//!
//! ```rust
//! use devhosts::config::ServiceMapping;
//! use devhosts::registry::ServiceRegistry;
//!
//! let mapping: ServiceMapping = "cloud-proxy-service=,docs".parse().unwrap();
//! let registry = ServiceRegistry::from_mappings(&[mapping], "example.com");
//!
//! assert_eq!(
//!     registry.names_for("cloud-proxy-service"),
//!     Some(&["example.com".to_string(), "docs.example.com".to_string()][..])
//! );
//! ```

pub mod config;
pub mod errors;
pub mod hosts;
pub mod registry;
pub mod sync;
pub mod watch;
