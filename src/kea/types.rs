// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kea Control Agent command and response types.

use crate::constants::{KEA_RESULT_EMPTY, KEA_RESULT_SUCCESS, KEA_RESULT_UNSUPPORTED};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv4Addr;

/// `subnet4-list` - list IPv4 subnets
pub const CMD_SUBNET4_LIST: &str = "subnet4-list";
/// `subnet4-get` - fetch one IPv4 subnet with its options
pub const CMD_SUBNET4_GET: &str = "subnet4-get";
/// `lease4-get-by-hw-address` - leases held by a hardware address
pub const CMD_LEASE4_GET_BY_HW_ADDRESS: &str = "lease4-get-by-hw-address";
/// `reservation-get-by-id` - host reservations by identifier
pub const CMD_RESERVATION_GET_BY_ID: &str = "reservation-get-by-id";
/// `reservation-get-all` - every host reservation in a subnet
pub const CMD_RESERVATION_GET_ALL: &str = "reservation-get-all";
/// `reservation-add` - create a host reservation
pub const CMD_RESERVATION_ADD: &str = "reservation-add";
/// `reservation-del` - delete a host reservation
pub const CMD_RESERVATION_DEL: &str = "reservation-del";
/// `version-get` - server version, used as a connectivity probe
pub const CMD_VERSION_GET: &str = "version-get";

/// A command sent to the Kea Control Agent.
///
/// Serializes as `{"command": .., "service": [..], "arguments": {..}}`, with
/// absent fields omitted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeaRequest {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl KeaRequest {
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            service: None,
            arguments: None,
        }
    }

    #[must_use]
    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    /// Route the command to a daemon behind the control agent (e.g. `dhcp4`).
    #[must_use]
    pub fn with_service(mut self, service: Option<&str>) -> Self {
        self.service = service.map(|s| vec![s.to_string()]);
        self
    }
}

/// A decoded Kea response.
///
/// `arguments` is only populated when the payload carried an object there.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeaResponse {
    pub result: i64,
    pub text: String,
    pub arguments: Option<Value>,
}

impl KeaResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result == KEA_RESULT_SUCCESS
    }

    /// Result code 3: the command ran but matched nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result == KEA_RESULT_EMPTY
    }

    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        self.result == KEA_RESULT_UNSUPPORTED
            || crate::kea_errors::text_indicates_unsupported(&self.text)
    }

    /// Look up one key of the `arguments` object.
    #[must_use]
    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.as_ref().and_then(|args| args.get(key))
    }
}

/// Subnet entry of a `subnet4-list` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SubnetEntry {
    pub id: u32,
    #[serde(default)]
    pub subnet: String,
}

/// One `option-data` entry of a subnet.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct OptionData {
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Subnet entry of a `subnet4-get` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct SubnetDetailEntry {
    pub id: u32,
    #[serde(default)]
    pub subnet: String,
    #[serde(default, rename = "option-data")]
    pub option_data: Vec<OptionData>,
}

/// Lease entry of a `lease4-get-by-hw-address` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct LeaseEntry {
    #[serde(default, rename = "hw-address")]
    pub hw_address: String,
    #[serde(default, rename = "ip-address")]
    pub ip_address: String,
    #[serde(default, rename = "subnet-id")]
    pub subnet_id: Option<u32>,
    /// Seconds since the epoch; some Kea builds write it as a float.
    #[serde(default)]
    pub cltt: Option<f64>,
}

/// Host entry of a `reservation-get-*` response.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct HostEntry {
    #[serde(default, rename = "hw-address")]
    pub hw_address: String,
    #[serde(default, rename = "ip-address")]
    pub ip_address: String,
    #[serde(default, rename = "subnet-id")]
    pub subnet_id: Option<u32>,
}

/// Kea returns `leases` either as a list or, on some deployments, as a single object.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

/// A current or reserved IPv4 address for a hardware address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeaseMatch {
    pub ip: Ipv4Addr,
    /// Subnet the address belongs to, when Kea reported one.
    pub subnet_id: Option<u32>,
}

/// Gateway and DNS settings of a Kea subnet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubnetDetails {
    pub id: u32,
    pub cidr: String,
    pub gateway: Option<String>,
    pub dns: Vec<String>,
}
