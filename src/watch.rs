// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service event watcher.
//!
//! Consumes the Kubernetes watch stream for `core/v1` Services in one
//! namespace and turns it into a stream of [`AddressUpdate`] records for
//! the hosts synchronizer. Per event:
//!
//! 1. Services not in the registry are skipped silently - most Services
//!    in a cluster are irrelevant to this tool.
//! 2. Only the *first* `LoadBalancer` ingress point is inspected. This is
//!    a deliberate, documented policy, not a best-address selection.
//! 3. A literal ingress IP is emitted as-is; an ingress hostname is
//!    resolved first and the first resolved IP is emitted.
//! 4. An unresolvable hostname or an empty ingress list drops the event
//!    with a log line; the Service simply gets no update until a later
//!    event carries a usable address.
//!
//! Updates are emitted in event order, with no coalescing: rapid
//! successive updates for one Service may briefly remove and re-add its
//! binding downstream. That is accepted, not corrected.

use crate::errors::SyncError;
use crate::registry::ServiceRegistry;
use futures::{Stream, StreamExt};
use hickory_resolver::TokioAsyncResolver;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, Service};
use kube::runtime::watcher::{Error as WatcherError, Event};
use kube::ResourceExt;
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One resolved address change, handed from the watcher to the
/// synchronizer and consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressUpdate {
    /// The Service this address belongs to; always a registry key
    pub service: String,
    /// The externally reachable address, already resolved to an IP
    pub addr: IpAddr,
}

/// What the first ingress point of a Service offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IngressAddress<'a> {
    /// A literal IP address, usable immediately
    Ip(IpAddr),
    /// A hostname that must be resolved before use
    Hostname(&'a str),
    /// No ingress point, or one carrying neither IP nor hostname
    None,
}

/// Classify the first `LoadBalancer` ingress point of a Service.
///
/// Ingress points beyond index 0 are ignored by policy.
pub(crate) fn ingress_address(service: &Service) -> IngressAddress<'_> {
    let first: Option<&LoadBalancerIngress> = service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first());

    let Some(ingress) = first else {
        return IngressAddress::None;
    };

    if let Some(ip) = ingress.ip.as_deref().filter(|ip| !ip.is_empty()) {
        match ip.parse::<IpAddr>() {
            Ok(addr) => return IngressAddress::Ip(addr),
            Err(e) => {
                warn!(ip = %ip, error = %e, "ignoring unparseable ingress IP");
                return IngressAddress::None;
            }
        }
    }

    match ingress.hostname.as_deref().filter(|host| !host.is_empty()) {
        Some(host) => IngressAddress::Hostname(host),
        None => IngressAddress::None,
    }
}

/// Produce the update for one Service change, if it yields a usable
/// address. Resolution failures degrade to dropping the event.
async fn update_for(
    service: &Service,
    registry: &ServiceRegistry,
    resolver: &TokioAsyncResolver,
) -> Option<AddressUpdate> {
    let name = service.name_any();

    if !registry.contains(&name) {
        debug!(service = %name, "service not registered, skipping");
        return None;
    }

    match ingress_address(service) {
        IngressAddress::Ip(addr) => Some(AddressUpdate {
            service: name,
            addr,
        }),
        IngressAddress::Hostname(host) => {
            debug!(service = %name, hostname = %host, "resolving ingress hostname");
            match resolver.lookup_ip(host).await {
                Ok(lookup) => {
                    let addr = lookup.iter().next();
                    if addr.is_none() {
                        warn!(service = %name, hostname = %host, "hostname resolved to no addresses, dropping event");
                    }
                    addr.map(|addr| AddressUpdate {
                        service: name,
                        addr,
                    })
                }
                Err(e) => {
                    warn!(service = %name, hostname = %host, error = %e, "hostname resolution failed, dropping event");
                    None
                }
            }
        }
        IngressAddress::None => {
            debug!(service = %name, "no external ingress address yet, skipping");
            None
        }
    }
}

/// Consume the watch stream until it closes, forwarding updates in FIFO
/// order over the bounded handoff channel.
///
/// Returns `Ok(())` when the stream ends; a stream error is fatal and
/// propagated so the caller can tear down the paired synchronizer.
pub async fn run<S>(
    events: S,
    registry: Arc<ServiceRegistry>,
    resolver: TokioAsyncResolver,
    tx: mpsc::Sender<AddressUpdate>,
) -> Result<(), SyncError>
where
    S: Stream<Item = Result<Event<Service>, WatcherError>>,
{
    futures::pin_mut!(events);

    while let Some(event) = events.next().await {
        let service = match event? {
            // Both live changes and the initial-list replay carry a full
            // Service object; deletions are left for the cleanup pass.
            Event::Apply(service) | Event::InitApply(service) => service,
            Event::Delete(service) => {
                debug!(service = %service.name_any(), "service deleted, keeping last binding until shutdown");
                continue;
            }
            Event::Init | Event::InitDone => continue,
        };

        if let Some(update) = update_for(&service, &registry, &resolver).await {
            debug!(service = %update.service, addr = %update.addr, "emitting address update");
            tx.send(update)
                .await
                .map_err(|_| SyncError::ChannelClosed)?;
        }
    }

    debug!("service watch stream ended");
    Ok(())
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
