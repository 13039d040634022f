// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line configuration.
//!
//! All configuration is resolved once in `main` and frozen: the namespace
//! to watch, the domain suffix, the service-to-prefix mappings the
//! registry is built from, and the hosts/backup file paths. There is no
//! runtime reconfiguration.
//!
//! Service mappings use the syntax `SERVICE=PREFIX[,PREFIX...]`. An empty
//! prefix element maps the service to the bare domain suffix:
//!
//! ```text
//! --map cloud-proxy-service=,work,docs --domain example.com
//! ```
//!
//! binds `cloud-proxy-service` to `example.com`, `work.example.com` and
//! `docs.example.com`.

use crate::errors::SyncError;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// Keep the local hosts file in sync with Kubernetes `LoadBalancer` services.
#[derive(Parser, Debug, Clone)]
#[command(name = "devhosts", version, about)]
pub struct Cli {
    /// The Kubernetes namespace to watch
    #[arg(short = 'n', long, default_value = "default")]
    pub namespace: String,

    /// Domain suffix appended to every mapped prefix
    #[arg(long)]
    pub domain: String,

    /// Service mapping, repeatable: SERVICE=PREFIX[,PREFIX...]
    ///
    /// An empty prefix element maps to the bare domain suffix.
    #[arg(long = "map", value_name = "SERVICE=PREFIX[,PREFIX...]", required = true)]
    pub mappings: Vec<ServiceMapping>,

    /// Absolute path to a kubeconfig file (defaults to the inferred
    /// in-cluster or `KUBECONFIG`/`~/.kube/config` configuration)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// The hosts file to keep in sync
    #[arg(long, default_value = "/etc/hosts")]
    pub hosts_file: PathBuf,

    /// Where to copy the hosts file before watching (defaults to
    /// `<hosts-file>.bak`)
    #[arg(long)]
    pub backup_file: Option<PathBuf>,
}

impl Cli {
    /// Resolve the backup path, deriving `<hosts-file>.bak` when no
    /// explicit `--backup-file` was given.
    #[must_use]
    pub fn backup_path(&self) -> PathBuf {
        self.backup_file.clone().unwrap_or_else(|| {
            let mut path = self.hosts_file.clone().into_os_string();
            path.push(".bak");
            PathBuf::from(path)
        })
    }
}

/// One `--map` flag value: a Service name and its domain prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceMapping {
    /// The Kubernetes Service name, as reported by the API server
    pub service: String,
    /// Domain prefixes; an empty string means the bare domain suffix
    pub prefixes: Vec<String>,
}

impl FromStr for ServiceMapping {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((service, prefixes)) = s.split_once('=') else {
            return Err(SyncError::InvalidMapping {
                value: s.to_string(),
                reason: "expected SERVICE=PREFIX[,PREFIX...]".to_string(),
            });
        };

        if service.is_empty() {
            return Err(SyncError::InvalidMapping {
                value: s.to_string(),
                reason: "service name is empty".to_string(),
            });
        }

        // "svc=" yields a single empty prefix, i.e. the bare domain.
        Ok(Self {
            service: service.to_string(),
            prefixes: prefixes.split(',').map(str::to_string).collect(),
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
