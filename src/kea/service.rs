// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DHCP management operations built on the Kea command channel.
//!
//! [`DhcpService`] turns the loosely typed control-agent answers into typed
//! results: subnet ids, lease addresses, and whether a reservation was
//! created or deleted. "Nothing found" is a value, not an error.

use super::client::CommandTransport;
use super::options::gateway_and_dns;
use super::types::{
    HostEntry, KeaRequest, KeaResponse, LeaseEntry, LeaseMatch, OneOrMany, SubnetDetailEntry,
    SubnetDetails, SubnetEntry, CMD_LEASE4_GET_BY_HW_ADDRESS, CMD_RESERVATION_ADD,
    CMD_RESERVATION_DEL, CMD_RESERVATION_GET_ALL, CMD_RESERVATION_GET_BY_ID, CMD_SUBNET4_GET,
    CMD_SUBNET4_LIST, CMD_VERSION_GET,
};
use crate::constants::{KEA_IDENTIFIER_HW_ADDRESS, KEA_OPERATION_TARGET_ALL};
use crate::kea_errors::{text_indicates_not_found, KeaError};
use crate::mac::canonicalize;
use ipnet::Ipv4Net;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Map a non-success response to an error. "Not supported" wins over the generic failure.
fn check_result(command: &str, response: &KeaResponse) -> Result<(), KeaError> {
    if response.is_success() {
        return Ok(());
    }
    if response.is_unsupported() {
        return Err(KeaError::Unsupported {
            command: command.to_string(),
            text: response.text.clone(),
        });
    }
    Err(KeaError::Remote {
        command: command.to_string(),
        result: response.result,
        text: response.text.clone(),
    })
}

/// Deserialize `arguments[key]` of a successful response.
fn argument<T: DeserializeOwned>(
    command: &str,
    response: &KeaResponse,
    key: &str,
) -> Result<T, KeaError> {
    let value = response
        .argument(key)
        .cloned()
        .ok_or_else(|| KeaError::UnexpectedShape {
            command: command.to_string(),
            reason: format!("arguments.{key} is missing"),
        })?;
    serde_json::from_value(value).map_err(|e| KeaError::UnexpectedShape {
        command: command.to_string(),
        reason: format!("arguments.{key}: {e}"),
    })
}

fn hosts_of(response: &KeaResponse) -> Vec<HostEntry> {
    response
        .argument("hosts")
        .cloned()
        .and_then(|v| serde_json::from_value::<Vec<Value>>(v).ok())
        .unwrap_or_default()
        .into_iter()
        .filter_map(|h| serde_json::from_value(h).ok())
        .collect()
}

fn same_mac(candidate: &str, mac: &str) -> bool {
    canonicalize(candidate).is_ok_and(|c| c == mac)
}

/// Pick the most recent usable lease for `mac`: exact hardware-address match,
/// a parsable IPv4 address, highest `cltt`. The first entry wins ties.
fn best_lease(leases: Vec<LeaseEntry>, mac: &str) -> Option<LeaseMatch> {
    let mut best: Option<(f64, LeaseMatch)> = None;
    for lease in leases {
        if !same_mac(&lease.hw_address, mac) {
            continue;
        }
        let Ok(ip) = Ipv4Addr::from_str(lease.ip_address.trim()) else {
            continue;
        };
        let cltt = lease.cltt.unwrap_or(0.0);
        if best.as_ref().is_none_or(|(best_cltt, _)| cltt > *best_cltt) {
            best = Some((
                cltt,
                LeaseMatch {
                    ip,
                    subnet_id: lease.subnet_id.filter(|id| *id != 0),
                },
            ));
        }
    }
    best.map(|(_, lease)| lease)
}

/// Subnet, lease and reservation operations against Kea.
pub struct DhcpService {
    transport: Arc<dyn CommandTransport>,
    service: Option<String>,
}

impl DhcpService {
    /// Create a service. `service` routes commands to a daemon behind the
    /// control agent (e.g. `dhcp4`); `None` sends them to the agent itself.
    #[must_use]
    pub fn new(transport: Arc<dyn CommandTransport>, service: Option<String>) -> Self {
        Self { transport, service }
    }

    fn request(&self, command: &str) -> KeaRequest {
        KeaRequest::new(command).with_service(self.service.as_deref())
    }

    /// Ask Kea for its version. Used by the start-up connectivity probe.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged; the caller interprets the result code.
    pub async fn probe_version(&self, deadline: Duration) -> Result<KeaResponse, KeaError> {
        self.transport
            .send_with_deadline(&self.request(CMD_VERSION_GET), deadline)
            .await
    }

    /// Find the id of the Kea subnet whose CIDR equals `cidr` exactly.
    ///
    /// # Errors
    ///
    /// - `InvalidCidr` if `cidr` is not an IPv4 network
    /// - `Unsupported` if Kea rejects `subnet4-list`
    /// - `SubnetNotFound` if no subnet matches
    /// - transport and remote errors otherwise
    pub async fn resolve_subnet_id(&self, cidr: &str) -> Result<u32, KeaError> {
        let cidr = cidr.trim();
        Ipv4Net::from_str(cidr).map_err(|e| KeaError::InvalidCidr {
            cidr: cidr.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.transport.send(&self.request(CMD_SUBNET4_LIST)).await?;
        if response.is_empty() && !response.is_unsupported() {
            return Err(KeaError::SubnetNotFound {
                cidr: cidr.to_string(),
            });
        }
        check_result(CMD_SUBNET4_LIST, &response)?;

        let subnets: Vec<Value> = argument(CMD_SUBNET4_LIST, &response, "subnets")?;
        subnets
            .into_iter()
            .filter_map(|s| serde_json::from_value::<SubnetEntry>(s).ok())
            .find(|s| s.subnet == cidr)
            .map(|s| {
                debug!(cidr = %cidr, subnet_id = s.id, "Resolved Kea subnet");
                s.id
            })
            .ok_or_else(|| KeaError::SubnetNotFound {
                cidr: cidr.to_string(),
            })
    }

    /// Fetch a subnet's CIDR, gateway and DNS servers.
    ///
    /// # Errors
    ///
    /// Returns an error if the subnet cannot be fetched or has no entry in the answer.
    pub async fn subnet_details(&self, subnet_id: u32) -> Result<SubnetDetails, KeaError> {
        let request = self
            .request(CMD_SUBNET4_GET)
            .with_arguments(json!({ "id": subnet_id }));
        let response = self.transport.send(&request).await?;
        check_result(CMD_SUBNET4_GET, &response)?;

        let entries: Vec<SubnetDetailEntry> = argument(CMD_SUBNET4_GET, &response, "subnet4")?;
        let entry = entries
            .into_iter()
            .next()
            .ok_or_else(|| KeaError::UnexpectedShape {
                command: CMD_SUBNET4_GET.to_string(),
                reason: "arguments.subnet4 is empty".to_string(),
            })?;

        let (gateway, dns) = gateway_and_dns(&entry.option_data);
        Ok(SubnetDetails {
            id: entry.id,
            cidr: entry.subnet,
            gateway,
            dns,
        })
    }

    /// Find the IPv4 address currently leased (or reserved) for `mac`.
    ///
    /// Leases are searched first; when none is usable, an address stored on
    /// a host reservation is returned instead. `Ok(None)` means the machine
    /// holds no address yet.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMac` for a malformed address, or the reservation
    /// fallback's transport error when both lookups fail to reach Kea.
    pub async fn lookup_lease_ipv4(&self, mac: &str) -> Result<Option<LeaseMatch>, KeaError> {
        let mac = canonicalize(mac)?;

        let request = self
            .request(CMD_LEASE4_GET_BY_HW_ADDRESS)
            .with_arguments(json!({ "hw-address": mac }));
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                let leases = response
                    .argument("leases")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<OneOrMany<Value>>(v).ok())
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|l| serde_json::from_value::<LeaseEntry>(l).ok())
                    .collect();
                if let Some(lease) = best_lease(leases, &mac) {
                    debug!(mac = %mac, ip = %lease.ip, subnet_id = ?lease.subnet_id, "Found lease");
                    return Ok(Some(lease));
                }
            }
            Ok(response) => {
                debug!(mac = %mac, result = response.result, text = %response.text, "No lease for MAC");
            }
            Err(e) => {
                debug!(mac = %mac, error = %e, "Lease lookup failed, trying reservations");
            }
        }

        let request = self
            .request(CMD_RESERVATION_GET_BY_ID)
            .with_arguments(json!({
                "identifier-type": KEA_IDENTIFIER_HW_ADDRESS,
                "identifier": mac,
            }));
        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Ok(None);
        }

        Ok(hosts_of(&response).into_iter().find_map(|host| {
            Ipv4Addr::from_str(host.ip_address.trim())
                .ok()
                .map(|ip| LeaseMatch {
                    ip,
                    subnet_id: host.subnet_id.filter(|id| *id != 0),
                })
        }))
    }

    /// Whether a reservation for `mac` exists in `subnet_id`.
    ///
    /// Looks the MAC up by identifier first. If that command fails for any
    /// reason other than "not found", every reservation of the subnet is
    /// listed and scanned instead.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMac` for a malformed address, `Unsupported` if the
    /// host commands are unavailable, or a transport error from the fallback.
    pub async fn reservation_exists(&self, mac: &str, subnet_id: u32) -> Result<bool, KeaError> {
        let mac = canonicalize(mac)?;

        let request = self
            .request(CMD_RESERVATION_GET_BY_ID)
            .with_arguments(json!({
                "identifier-type": KEA_IDENTIFIER_HW_ADDRESS,
                "identifier": mac,
            }));
        match self.transport.send(&request).await {
            Ok(response) if response.is_success() => {
                return Ok(hosts_of(&response).iter().any(|host| {
                    same_mac(&host.hw_address, &mac)
                        && host.subnet_id.is_none_or(|id| id == subnet_id)
                }));
            }
            Ok(response) if response.is_empty() || text_indicates_not_found(&response.text) => {
                return Ok(false);
            }
            Ok(response) => {
                debug!(mac = %mac, result = response.result, text = %response.text, "reservation-get-by-id failed, listing subnet reservations");
            }
            Err(e) => {
                debug!(mac = %mac, error = %e, "reservation-get-by-id failed, listing subnet reservations");
            }
        }

        let request = self
            .request(CMD_RESERVATION_GET_ALL)
            .with_arguments(json!({ "subnet-id": subnet_id }));
        let response = self.transport.send(&request).await?;
        if response.is_unsupported() {
            check_result(CMD_RESERVATION_GET_ALL, &response)?;
        }
        if !response.is_success() {
            return Ok(false);
        }

        Ok(hosts_of(&response)
            .iter()
            .any(|host| same_mac(&host.hw_address, &mac)))
    }

    /// Make sure `mac` holds a reservation in `subnet_id`.
    ///
    /// Without `ip` the reservation is MAC-only and Kea allocates from the
    /// pool on the next DHCP request. Returns `true` if a reservation was
    /// added, `false` if one already existed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMac`, `Unsupported`, or the error of `reservation-add`.
    pub async fn ensure_reservation(
        &self,
        mac: &str,
        subnet_id: u32,
        ip: Option<Ipv4Addr>,
    ) -> Result<bool, KeaError> {
        let mac = canonicalize(mac)?;

        if self.reservation_exists(&mac, subnet_id).await? {
            debug!(mac = %mac, subnet_id = subnet_id, "Reservation already present");
            return Ok(false);
        }

        let mut reservation = json!({
            "subnet-id": subnet_id,
            "hw-address": mac,
        });
        if let Some(ip) = ip {
            reservation["ip-address"] = Value::String(ip.to_string());
        }

        let request = self.request(CMD_RESERVATION_ADD).with_arguments(json!({
            "reservation": reservation,
            "operation-target": KEA_OPERATION_TARGET_ALL,
        }));
        let response = self.transport.send(&request).await?;

        if !response.is_success() && response.text.to_lowercase().contains("already exist") {
            debug!(mac = %mac, subnet_id = subnet_id, "Kea reports reservation already exists");
            return Ok(false);
        }
        check_result(CMD_RESERVATION_ADD, &response)?;

        info!(mac = %mac, subnet_id = subnet_id, ip = ?ip, "Added DHCP reservation");
        Ok(true)
    }

    /// Remove the reservation of `mac` from `subnet_id`, in memory and in the
    /// persistent host store. Returns `false` if there was nothing to delete.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMac`, `Unsupported`, transport errors, or the remote error.
    pub async fn delete_reservation(&self, mac: &str, subnet_id: u32) -> Result<bool, KeaError> {
        let mac = canonicalize(mac)?;

        let request = self.request(CMD_RESERVATION_DEL).with_arguments(json!({
            "subnet-id": subnet_id,
            "identifier-type": KEA_IDENTIFIER_HW_ADDRESS,
            "identifier": mac,
            "operation-target": KEA_OPERATION_TARGET_ALL,
        }));
        let response = self.transport.send(&request).await?;

        if response.is_empty() || (!response.is_success() && text_indicates_not_found(&response.text)) {
            debug!(mac = %mac, subnet_id = subnet_id, "No reservation to delete");
            return Ok(false);
        }
        check_result(CMD_RESERVATION_DEL, &response)?;

        info!(mac = %mac, subnet_id = subnet_id, "Deleted DHCP reservation");
        Ok(true)
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
