// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `NetworkConfiguration` reconciliation.
//!
//! Each pass maps the MAC addresses declared on a resource to Kea host
//! reservations in the subnet matching the namespace's IPv4 prefix, then
//! projects the outcome into status.
//!
//! # Reconciliation flow
//!
//! 1. Deleted resources: remove reservations best-effort, then drop the finalizer
//! 2. Resources without the finalizer: add it and requeue immediately
//! 3. Resolve the namespace prefix and its Kea subnet
//! 4. Per MAC: look up a lease, then ensure a reservation (with the leased
//!    address when it lies inside the prefix, MAC-only otherwise)
//! 5. Write status only when a meaningful field changed

use crate::config::ReservationPolicy;
use crate::constants::{
    KIND_NETWORK_CONFIGURATION, NETWORK_CONFIGURATION_FINALIZER, REQUEUE_MAC_FAILURE_SECS,
    REQUEUE_RESOLVE_FAILURE_SECS,
};
use crate::context::Context;
use crate::crd::{NetworkConfiguration, NetworkConfigurationStatus, NetworkInterfaceStatus};
use crate::kea::types::{LeaseMatch, SubnetDetails};
use crate::mac::{canonicalize, extract_macs};
use crate::metrics::{
    record_reconciliation_requeue, record_reservation_created, record_reservation_deleted,
};
use crate::reconcilers::finalizers::has_finalizer;
use crate::reconcilers::status::{needs_reconciling_mark, next_status, status_changed, Phase};
use crate::status_reasons::{
    REASON_CONFIGURED, REASON_NETWORK_NAMESPACE_NOT_FOUND, REASON_NO_MAC_ADDRESSES,
    REASON_RECONCILING, REASON_RESERVATION_FAILED,
};
use anyhow::Result;
use ipnet::Ipv4Net;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the controller should do after a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Run again right away.
    RequeueNow,
    /// Run again after the delay.
    Requeue(Duration),
    /// Wait for the next change event.
    Done,
}

impl From<ReconcileAction> for Action {
    fn from(action: ReconcileAction) -> Self {
        match action {
            ReconcileAction::RequeueNow => Action::requeue(Duration::ZERO),
            ReconcileAction::Requeue(after) => Action::requeue(after),
            ReconcileAction::Done => Action::await_change(),
        }
    }
}

/// Result of ensuring one MAC's reservation.
#[derive(Clone, Debug)]
struct MacOutcome {
    ip: Option<Ipv4Addr>,
    reserved: bool,
}

/// Reconcile one `NetworkConfiguration`.
///
/// Kea failures are recorded in status and turned into a requeue; only
/// cluster-store failures are returned as errors.
///
/// # Errors
///
/// Returns an error if a finalizer or status patch, or the `NetworkNamespace`
/// lookup, fails.
pub async fn reconcile_network_configuration(
    ctx: &Context,
    nc: &NetworkConfiguration,
) -> Result<ReconcileAction> {
    let namespace = nc.namespace().unwrap_or_default();
    let name = nc.name_any();

    if nc.metadata.deletion_timestamp.is_some() {
        if has_finalizer(nc, NETWORK_CONFIGURATION_FINALIZER) {
            info!(namespace = %namespace, name = %name, "Cleaning up DHCP reservations");
            cleanup_reservations(ctx, nc).await;
            ctx.store.remove_finalizer(nc).await?;
        }
        return Ok(ReconcileAction::Done);
    }

    if !has_finalizer(nc, NETWORK_CONFIGURATION_FINALIZER) {
        ctx.store.add_finalizer(nc).await?;
        return Ok(ReconcileAction::RequeueNow);
    }

    let mut current = nc.status.clone();
    if needs_reconciling_mark(current.as_ref(), nc.metadata.generation) {
        current = Some(
            write_status(
                ctx,
                nc,
                current.as_ref(),
                Phase::Reconciling,
                REASON_RECONCILING,
                "Reconciling DHCP reservations",
                None,
            )
            .await?,
        );
    }
    let current = current.as_ref();

    let Some(prefix) = ctx.store.namespace_ipv4_prefix(&namespace).await? else {
        warn!(namespace = %namespace, name = %name, "No NetworkNamespace with an IPv4 prefix");
        write_status(
            ctx,
            nc,
            current,
            Phase::Error,
            REASON_NETWORK_NAMESPACE_NOT_FOUND,
            &format!("No NetworkNamespace with an IPv4 prefix found in namespace {namespace}"),
            None,
        )
        .await?;
        record_reconciliation_requeue(KIND_NETWORK_CONFIGURATION, "namespace_not_found");
        return Ok(ReconcileAction::Requeue(Duration::from_secs(
            REQUEUE_RESOLVE_FAILURE_SECS,
        )));
    };

    let macs = extract_macs(&nc.spec.network_interfaces);
    if macs.is_empty() {
        write_status(
            ctx,
            nc,
            current,
            Phase::Ready,
            REASON_NO_MAC_ADDRESSES,
            "No MAC addresses to configure",
            Some(project_interfaces(nc, &prefix, None, &HashMap::new())),
        )
        .await?;
        return Ok(ReconcileAction::Done);
    }

    let subnet_id = match ctx.dhcp.resolve_subnet_id(&prefix).await {
        Ok(id) => id,
        Err(e) => {
            warn!(namespace = %namespace, name = %name, prefix = %prefix, error = %e, "Failed to resolve Kea subnet");
            write_status(
                ctx,
                nc,
                current,
                Phase::Error,
                e.status_reason(),
                &format!("Failed to resolve Kea subnet for {prefix}: {e}"),
                None,
            )
            .await?;
            if e.is_unsupported() {
                return Ok(ReconcileAction::Done);
            }
            record_reconciliation_requeue(KIND_NETWORK_CONFIGURATION, "subnet_unresolved");
            return Ok(ReconcileAction::Requeue(Duration::from_secs(
                REQUEUE_RESOLVE_FAILURE_SECS,
            )));
        }
    };

    let details = match ctx.dhcp.subnet_details(subnet_id).await {
        Ok(details) => Some(details),
        Err(e) => {
            warn!(subnet_id, error = %e, "Failed to fetch Kea subnet details");
            None
        }
    };

    let prefix_net = prefix.parse::<Ipv4Net>().ok();
    let mut outcomes: HashMap<String, MacOutcome> = HashMap::new();
    let mut errors = Vec::new();

    for mac in &macs {
        let lease = match ctx.dhcp.lookup_lease_ipv4(mac).await {
            Ok(lease) => lease,
            Err(e) => {
                debug!(mac = %mac, error = %e, "Lease lookup failed");
                None
            }
        };
        let lease = lease.filter(|l| in_prefix(l, prefix_net.as_ref(), mac));

        let (target_subnet, ip) = match &lease {
            Some(l) => (l.subnet_id.unwrap_or(subnet_id), Some(l.ip)),
            None => (subnet_id, None),
        };

        if ip.is_none() && ctx.policy == ReservationPolicy::RequireLease {
            errors.push(format!("{mac}: no lease within {prefix}"));
            continue;
        }

        match ctx.dhcp.ensure_reservation(mac, target_subnet, ip).await {
            Ok(created) => {
                if created {
                    record_reservation_created();
                }
                outcomes.insert(mac.clone(), MacOutcome { ip, reserved: true });
            }
            Err(e) => {
                warn!(mac = %mac, subnet_id = target_subnet, error = %e, "Failed to ensure reservation");
                errors.push(format!("{mac}: {e}"));
            }
        }
    }

    let interfaces = project_interfaces(nc, &prefix, details.as_ref(), &outcomes);

    if !errors.is_empty() {
        write_status(
            ctx,
            nc,
            current,
            Phase::Error,
            REASON_RESERVATION_FAILED,
            &format!(
                "Failed to configure {} of {} MAC reservations: {}",
                errors.len(),
                macs.len(),
                errors.join("; ")
            ),
            Some(interfaces),
        )
        .await?;
        record_reconciliation_requeue(KIND_NETWORK_CONFIGURATION, "reservation_failed");
        return Ok(ReconcileAction::Requeue(Duration::from_secs(
            REQUEUE_MAC_FAILURE_SECS,
        )));
    }

    let with_ip = outcomes.values().filter(|o| o.ip.is_some()).count();
    write_status(
        ctx,
        nc,
        current,
        Phase::Ready,
        REASON_CONFIGURED,
        &summary_message(outcomes.len(), with_ip),
        Some(interfaces),
    )
    .await?;

    debug!(namespace = %namespace, name = %name, reservations = outcomes.len(), "NetworkConfiguration reconciled");
    record_reconciliation_requeue(KIND_NETWORK_CONFIGURATION, "poll");
    Ok(ReconcileAction::Requeue(ctx.reconcile_interval))
}

/// Summary written to status after every MAC succeeded.
#[must_use]
pub fn summary_message(total: usize, with_ip: usize) -> String {
    let without_ip = total.saturating_sub(with_ip);
    if without_ip == 0 {
        format!("All {total} MAC reservations configured with assigned IPs")
    } else if with_ip == 0 {
        format!("All {total} MAC reservations configured (IPs will be auto-allocated on DHCP request)")
    } else {
        format!(
            "{total} MAC reservations configured ({with_ip} with IP, {without_ip} will get IP on DHCP request)"
        )
    }
}

fn in_prefix(lease: &LeaseMatch, prefix: Option<&Ipv4Net>, mac: &str) -> bool {
    let inside = prefix.is_some_and(|net| net.contains(&lease.ip));
    if !inside {
        debug!(mac = %mac, ip = %lease.ip, "Lease outside namespace prefix, reserving MAC only");
    }
    inside
}

/// Per-interface status in declaration order.
fn project_interfaces(
    nc: &NetworkConfiguration,
    prefix: &str,
    details: Option<&SubnetDetails>,
    outcomes: &HashMap<String, MacOutcome>,
) -> Vec<NetworkInterfaceStatus> {
    nc.spec
        .network_interfaces
        .iter()
        .map(|iface| {
            let mac = canonicalize(&iface.mac_address).ok();
            let outcome = mac.as_ref().and_then(|m| outcomes.get(m));
            NetworkInterfaceStatus {
                name: iface.name.clone(),
                mac_address: iface.mac_address.clone(),
                vlan: iface.vlan.clone(),
                ipv4_addresses: outcome
                    .and_then(|o| o.ip)
                    .map(|ip| vec![ip.to_string()])
                    .unwrap_or_default(),
                ipv4_subnet: Some(prefix.to_string()),
                ipv4_gateway: details.and_then(|d| d.gateway.clone()),
                dns: details.map(|d| d.dns.clone()).unwrap_or_default(),
                dhcp_reserved: outcome.is_some_and(|o| o.reserved),
            }
        })
        .collect()
}

/// Remove every declared MAC's reservation. Failures are logged, never returned.
async fn cleanup_reservations(ctx: &Context, nc: &NetworkConfiguration) {
    let namespace = nc.namespace().unwrap_or_default();

    let prefix = match ctx.store.namespace_ipv4_prefix(&namespace).await {
        Ok(Some(prefix)) => prefix,
        Ok(None) => {
            debug!(namespace = %namespace, "No namespace prefix, skipping reservation cleanup");
            return;
        }
        Err(e) => {
            debug!(namespace = %namespace, error = %e, "Namespace lookup failed, skipping reservation cleanup");
            return;
        }
    };

    let subnet_id = match ctx.dhcp.resolve_subnet_id(&prefix).await {
        Ok(id) => id,
        Err(e) => {
            debug!(prefix = %prefix, error = %e, "Subnet resolution failed, skipping reservation cleanup");
            return;
        }
    };

    for mac in extract_macs(&nc.spec.network_interfaces) {
        match ctx.dhcp.delete_reservation(&mac, subnet_id).await {
            Ok(true) => record_reservation_deleted(),
            Ok(false) => {}
            Err(e) => {
                debug!(mac = %mac, subnet_id, error = %e, "Failed to delete reservation");
            }
        }
    }
}

/// Build the next status and patch it if anything meaningful changed.
async fn write_status(
    ctx: &Context,
    nc: &NetworkConfiguration,
    current: Option<&NetworkConfigurationStatus>,
    phase: Phase,
    reason: &str,
    message: &str,
    interfaces: Option<Vec<NetworkInterfaceStatus>>,
) -> Result<NetworkConfigurationStatus> {
    let next = next_status(
        current,
        phase,
        reason,
        message,
        nc.metadata.generation,
        interfaces,
    );
    if status_changed(current, &next) {
        ctx.store.patch_status(nc, &next).await?;
    } else {
        debug!(name = %nc.name_any(), "Status unchanged, skipping patch");
    }
    Ok(next)
}
