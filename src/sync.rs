// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hosts synchronizer.
//!
//! Single consumer of the handoff channel: applies one [`AddressUpdate`]
//! at a time to the hosts file. Each application removes any existing
//! bindings for the service's names before adding the new one, so for any
//! registered name at most one binding in the file ever contains it.
//!
//! Being the only consumer also makes this the only writer of the hosts
//! file while the workers run; the cleanup pass takes over only after the
//! sync loop has fully exited, so no locking is needed.
//!
//! A failed save is fatal for the whole process: the on-disk state and
//! the number of unflushed changes are unknown, so we exit and let the
//! supervisor restart us rather than retry silently.

use crate::errors::SyncError;
use crate::hosts::HostsFile;
use crate::registry::ServiceRegistry;
use crate::watch::AddressUpdate;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Apply one update: remove the service's old bindings, add the new
/// address, save.
///
/// An update for a service the registry does not know is dropped with a
/// warning rather than treated as fatal; none can occur after startup,
/// but the registry lookup is the synchronizer's own defense.
pub fn apply_update(
    update: &AddressUpdate,
    registry: &ServiceRegistry,
    hosts_path: &Path,
) -> Result<(), SyncError> {
    let Some(names) = registry.names_for(&update.service) else {
        warn!(service = %update.service, "dropping update for unregistered service");
        return Ok(());
    };

    info!(service = %update.service, addr = %update.addr, "updating hosts file");

    let mut hosts = HostsFile::load(hosts_path)?;
    hosts.remove_names(names);
    hosts.add_binding(update.addr, names);
    hosts.save()
}

/// Consume updates until the watcher drops its sender, applying each one
/// in arrival order.
pub async fn run(
    mut rx: mpsc::Receiver<AddressUpdate>,
    registry: Arc<ServiceRegistry>,
    hosts_path: std::path::PathBuf,
) -> Result<(), SyncError> {
    while let Some(update) = rx.recv().await {
        apply_update(&update, &registry, &hosts_path)?;
    }
    Ok(())
}

/// Remove every name the registry could have bound and save.
///
/// Runs exactly once at shutdown, on every exit path short of an unclean
/// kill, so the hosts file never permanently retains stale entries.
pub fn cleanup(registry: &ServiceRegistry, hosts_path: &Path) -> Result<(), SyncError> {
    info!("cleaning up hosts file");

    let mut hosts = HostsFile::load(hosts_path)?;
    hosts.remove_names(&registry.all_names());
    hosts.save()
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod sync_tests;
