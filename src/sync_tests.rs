// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `sync.rs`

use crate::config::ServiceMapping;
use crate::hosts::HostsFile;
use crate::registry::ServiceRegistry;
use crate::sync::{apply_update, cleanup, run};
use crate::watch::AddressUpdate;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn test_registry() -> ServiceRegistry {
    ServiceRegistry::from_mappings(
        &[ServiceMapping {
            service: "svc-a".to_string(),
            prefixes: vec![String::new(), "docs".to_string()],
        }],
        "example.com",
    )
}

fn write_hosts(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("hosts");
    fs::write(&path, contents).unwrap();
    path
}

fn update(service: &str, addr: &str) -> AddressUpdate {
    AddressUpdate {
        service: service.to_string(),
        addr: addr.parse().unwrap(),
    }
}

#[test]
fn test_apply_update_binds_all_registry_names() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "127.0.0.1\tlocalhost\n");
    let registry = test_registry();

    apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap();

    let hosts = HostsFile::load(&path).unwrap();
    assert_eq!(hosts.addresses_for("example.com"), vec!["10.0.0.5"]);
    assert_eq!(hosts.addresses_for("docs.example.com"), vec!["10.0.0.5"]);
    assert_eq!(hosts.addresses_for("localhost"), vec!["127.0.0.1"]);
}

#[test]
fn test_apply_update_replaces_previous_binding() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "");
    let registry = test_registry();

    apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap();
    apply_update(&update("svc-a", "10.0.0.9"), &registry, &path).unwrap();

    // Uniqueness invariant: exactly one binding carries each name.
    let hosts = HostsFile::load(&path).unwrap();
    assert_eq!(hosts.addresses_for("example.com"), vec!["10.0.0.9"]);
    assert_eq!(hosts.addresses_for("docs.example.com"), vec!["10.0.0.9"]);
}

#[test]
fn test_apply_update_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "");
    let registry = test_registry();

    apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap();
    let once = fs::read_to_string(&path).unwrap();

    apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap();
    let twice = fs::read_to_string(&path).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_apply_update_unregistered_service_is_dropped() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "127.0.0.1\tlocalhost\n");
    let registry = test_registry();

    apply_update(&update("svc-b", "10.0.0.5"), &registry, &path).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "127.0.0.1\tlocalhost\n"
    );
}

#[test]
fn test_apply_update_missing_hosts_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-such-hosts");
    let registry = test_registry();

    let err = apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap_err();
    assert!(err.to_string().contains("failed to read hosts file"));
}

#[test]
fn test_cleanup_removes_every_registry_name() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "127.0.0.1\tlocalhost\n");
    let registry = test_registry();

    apply_update(&update("svc-a", "10.0.0.5"), &registry, &path).unwrap();
    cleanup(&registry, &path).unwrap();

    let hosts = HostsFile::load(&path).unwrap();
    assert!(hosts.addresses_for("example.com").is_empty());
    assert!(hosts.addresses_for("docs.example.com").is_empty());
    assert_eq!(hosts.addresses_for("localhost"), vec!["127.0.0.1"]);
}

#[tokio::test]
async fn test_cleanup_after_aborted_run_is_the_last_writer() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "127.0.0.1\tlocalhost\n");
    let registry = Arc::new(test_registry());

    // Queue a full batch, then abort mid-drain. Joining the aborted
    // task before cleanup is what guarantees no in-flight save lands
    // after cleanup's save.
    let (tx, rx) = mpsc::channel(16);
    for i in 0..16 {
        tx.send(update("svc-a", &format!("10.0.0.{i}"))).await.unwrap();
    }

    let mut task = tokio::spawn(run(rx, registry.clone(), path.clone()));
    task.abort();
    let _ = (&mut task).await;

    cleanup(&registry, &path).unwrap();

    let hosts = HostsFile::load(&path).unwrap();
    assert!(hosts.addresses_for("example.com").is_empty());
    assert!(hosts.addresses_for("docs.example.com").is_empty());
    assert_eq!(hosts.addresses_for("localhost"), vec!["127.0.0.1"]);
    drop(tx);
}

#[tokio::test]
async fn test_run_applies_updates_until_sender_drops() {
    let dir = TempDir::new().unwrap();
    let path = write_hosts(&dir, "");
    let registry = Arc::new(test_registry());

    let (tx, rx) = mpsc::channel(4);
    let task = tokio::spawn(run(rx, registry.clone(), path.clone()));

    tx.send(update("svc-a", "10.0.0.5")).await.unwrap();
    tx.send(update("svc-a", "10.0.0.9")).await.unwrap();
    drop(tx);

    task.await.unwrap().unwrap();

    let hosts = HostsFile::load(&path).unwrap();
    assert_eq!(hosts.addresses_for("example.com"), vec!["10.0.0.9"]);
}
