// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) consumed by the Kea operator.
//!
//! Both resources live in the `vitistack.io/v1alpha1` API group and are
//! installed by the platform; this crate only reads their specs and writes
//! `NetworkConfiguration` status.
//!
//! - [`NetworkConfiguration`] - declares the network interfaces (and MAC
//!   addresses) of a machine that need DHCP reservations
//! - [`NetworkNamespace`] - carries the IPv4 prefix allocated to a namespace
//!
//! # Example
//!
//! ```rust,no_run
//! use kea_operator::crd::{NetworkConfigurationSpec, NetworkInterface};
//!
//! let spec = NetworkConfigurationSpec {
//!     network_interfaces: vec![NetworkInterface {
//!         name: "eth0".to_string(),
//!         mac_address: "AA-BB-CC-DD-EE-FF".to_string(),
//!         vlan: None,
//!     }],
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. This operator writes a single `Ready` condition.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Generation of the resource the condition was computed from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// A network interface declared on a `NetworkConfiguration`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterface {
    /// Interface name (e.g., "eth0").
    #[serde(default)]
    pub name: String,

    /// Hardware address in any common notation (`aa:bb:..`, `AA-BB-..`).
    #[serde(default)]
    pub mac_address: String,

    /// VLAN the interface is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<String>,
}

/// `NetworkConfiguration` declares the interfaces of a machine whose MAC
/// addresses must hold DHCP reservations in the namespace's subnet.
///
/// # Example
///
/// ```yaml
/// apiVersion: vitistack.io/v1alpha1
/// kind: NetworkConfiguration
/// metadata:
///   name: worker-01
///   namespace: tenant-a
/// spec:
///   networkInterfaces:
///     - name: eth0
///       macAddress: "00:11:22:33:44:55"
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "vitistack.io",
    version = "v1alpha1",
    kind = "NetworkConfiguration",
    namespaced,
    doc = "NetworkConfiguration lists the network interfaces of a machine. Each MAC address is given a DHCP reservation in the subnet matching the namespace IPv4 prefix."
)]
#[kube(status = "NetworkConfigurationStatus")]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfigurationSpec {
    /// Interfaces to reserve addresses for.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// Per-interface projection written to `status.networkInterfaces`.
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceStatus {
    pub name: String,
    pub mac_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<String>,
    /// Addresses currently leased to the interface, if known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_gateway: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    /// Whether a DHCP reservation is in place for the interface's MAC address.
    #[serde(default)]
    pub dhcp_reserved: bool,
}

/// `NetworkConfiguration` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfigurationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Time the operator first wrote status for this resource (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterfaceStatus>,
}

/// `NetworkNamespace` describes the addressing policy of a namespace. Only
/// its status is read.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "vitistack.io",
    version = "v1alpha1",
    kind = "NetworkNamespace",
    namespaced,
    doc = "NetworkNamespace carries the IPv4 prefix allocated to a Kubernetes namespace."
)]
#[kube(status = "NetworkNamespaceStatus")]
#[serde(rename_all = "camelCase")]
pub struct NetworkNamespaceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `NetworkNamespace` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NetworkNamespaceStatus {
    /// IPv4 prefix (CIDR) assigned to the namespace, e.g. "10.10.0.0/24".
    #[serde(default, alias = "ipv4_prefix", skip_serializing_if = "Option::is_none")]
    pub ipv4_prefix: Option<String>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
