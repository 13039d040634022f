// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use devhosts::config::Cli;
use devhosts::errors::SyncError;
use devhosts::registry::ServiceRegistry;
use devhosts::{hosts, sync, watch};
use hickory_resolver::TokioAsyncResolver;
use k8s_openapi::api::core::v1::Service;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::runtime::watcher;
use kube::{Api, Client};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{debug, error, info};

/// Capacity of the watcher-to-synchronizer handoff channel.
const UPDATE_CHANNEL_CAPACITY: usize = 16;

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("devhosts")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Respects RUST_LOG_FORMAT environment variable for output format (text or json)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();

    info!("Starting devhosts");

    // Fatal on malformed configuration: never watch with a partial registry.
    let registry = Arc::new(ServiceRegistry::from_mappings(&cli.mappings, &cli.domain));

    let hosts_path = cli.hosts_file.clone();
    let backup_path = cli.backup_path();
    hosts::backup(&hosts_path, &backup_path)?;
    info!(hosts = %hosts_path.display(), backup = %backup_path.display(), "hosts file backed up");

    debug!("Initializing Kubernetes client");
    let kube_config = match &cli.kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("failed to read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("failed to build Kubernetes config from kubeconfig")?
        }
        None => kube::Config::infer()
            .await
            .context("failed to infer Kubernetes config")?,
    };
    let client = Client::try_from(kube_config).context("failed to create Kubernetes client")?;
    debug!("Kubernetes client initialized successfully");

    let resolver = TokioAsyncResolver::tokio_from_system_conf()
        .context("failed to build DNS resolver from system configuration")?;

    let services: Api<Service> = Api::namespaced(client, &cli.namespace);
    let events = watcher(services, watcher::Config::default());

    info!(namespace = %cli.namespace, services = registry.len(), "watching services");

    let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);

    let mut watch_task = tokio::spawn(watch::run(events, registry.clone(), resolver, tx));
    let mut sync_task = tokio::spawn(sync::run(rx, registry.clone(), hosts_path.clone()));

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    // First completion wins: a signal, either worker failing, or either
    // worker's stream closing normally all tear the pair down, and the
    // cleanup pass below runs unconditionally.
    let run_result: Result<()> = tokio::select! {
        res = &mut watch_task => flatten(res, "service watcher"),
        res = &mut sync_task => flatten(res, "hosts synchronizer"),
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
            Ok(())
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
            Ok(())
        }
    };

    watch_task.abort();
    sync_task.abort();

    // abort() only lands at the task's next await point, and an
    // in-flight update is blocking code: join both workers so the
    // cleanup pass below is the hosts file's last writer. The worker
    // that won the select already had its result consumed and must not
    // be polled again.
    for task in [&mut watch_task, &mut sync_task] {
        if !task.is_finished() {
            let _ = task.await;
        }
    }

    // Best-effort: log a failed final save but still exit.
    if let Err(e) = sync::cleanup(&registry, &hosts_path) {
        error!(error = %e, "failed to clean up hosts file on shutdown");
    }

    if let Err(e) = &run_result {
        error!(error = %e, "exiting after fatal error");
    }
    run_result
}

/// Collapse a task join result into the worker's own result.
fn flatten(res: Result<Result<(), SyncError>, JoinError>, worker: &str) -> Result<()> {
    match res {
        Ok(inner) => inner.with_context(|| format!("{worker} failed")),
        Err(e) => Err(e).with_context(|| format!("{worker} task panicked")),
    }
}
