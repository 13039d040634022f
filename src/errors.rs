// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for hosts-file synchronization.
//!
//! Per-event problems (an unresolvable hostname, a Service we do not
//! track, an empty ingress list) are *not* errors: they are logged and the
//! event is dropped inside the watcher. [`SyncError`] covers the failures
//! that are fatal for the process, plus the startup failures that abort
//! before watching begins.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate the synchronizer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Failed to copy the hosts file to its backup location at startup.
    ///
    /// The process never runs without a restorable backup, so this aborts
    /// before any watching begins.
    #[error("failed to back up hosts file {} to {}: {source}", .path.display(), .backup.display())]
    Backup {
        /// The hosts file being backed up
        path: PathBuf,
        /// The backup destination
        backup: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read the hosts file before applying an update.
    #[error("failed to read hosts file {}: {source}", .path.display())]
    HostsRead {
        /// The hosts file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to persist the hosts file after an update.
    ///
    /// Fatal: the on-disk state is now unknown, so the process exits and
    /// relies on its supervisor to restart it (backup, then re-watch).
    #[error("failed to save hosts file {}: {source}", .path.display())]
    HostsSave {
        /// The hosts file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A `--map` flag value could not be parsed into a service mapping.
    #[error("invalid service mapping '{value}': {reason}")]
    InvalidMapping {
        /// The raw flag value
        value: String,
        /// What was wrong with it
        reason: String,
    },

    /// The Kubernetes watch stream returned an error.
    ///
    /// Watch stream errors are not retried here: the whole worker pair is
    /// torn down and cleanup runs.
    #[error("service watch stream failed: {0}")]
    Watch(#[from] kube::runtime::watcher::Error),

    /// The synchronizer hung up before the watcher finished.
    ///
    /// Only reachable when the sync task died while the watcher still had
    /// updates to hand off.
    #[error("address update channel closed before the watch stream ended")]
    ChannelClosed,
}
