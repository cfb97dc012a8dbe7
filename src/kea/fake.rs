// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory Kea control agent for unit tests.
//!
//! Answers the commands the operator uses with the result codes and argument
//! shapes of a real Kea 2.x server, keeps reservations in memory, and records
//! every request it receives.

use super::client::CommandTransport;
use super::types::{KeaRequest, KeaResponse};
use crate::kea_errors::KeaError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone, Debug)]
pub(crate) struct FakeSubnet {
    pub id: u32,
    pub cidr: String,
    pub gateway: Option<String>,
    pub dns: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct FakeReservation {
    pub subnet_id: u32,
    pub mac: String,
    pub ip: Option<String>,
}

#[derive(Default)]
struct FakeState {
    subnets: Vec<FakeSubnet>,
    leases: Vec<Value>,
    single_lease_object: bool,
    reservations: Vec<FakeReservation>,
    overrides: HashMap<String, KeaResponse>,
    failing_adds: HashMap<String, String>,
    unreachable: bool,
    calls: Vec<KeaRequest>,
}

#[derive(Default)]
pub(crate) struct FakeKea {
    state: Mutex<FakeState>,
}

fn ok(text: &str, arguments: Value) -> KeaResponse {
    KeaResponse {
        result: 0,
        text: text.to_string(),
        arguments: Some(arguments),
    }
}

fn status(result: i64, text: &str) -> KeaResponse {
    KeaResponse {
        result,
        text: text.to_string(),
        arguments: None,
    }
}

fn arg_str(request: &KeaRequest, pointer: &str) -> String {
    request
        .arguments
        .as_ref()
        .and_then(|a| a.pointer(pointer))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn arg_u32(request: &KeaRequest, pointer: &str) -> u32 {
    request
        .arguments
        .as_ref()
        .and_then(|a| a.pointer(pointer))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or_default()
}

impl FakeKea {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn add_subnet(&self, id: u32, cidr: &str) {
        self.with_state(|s| {
            s.subnets.push(FakeSubnet {
                id,
                cidr: cidr.to_string(),
                gateway: None,
                dns: Vec::new(),
            });
        });
    }

    pub fn add_subnet_with_options(&self, id: u32, cidr: &str, gateway: &str, dns: &[&str]) {
        self.with_state(|s| {
            s.subnets.push(FakeSubnet {
                id,
                cidr: cidr.to_string(),
                gateway: Some(gateway.to_string()),
                dns: dns.iter().map(|d| (*d).to_string()).collect(),
            });
        });
    }

    pub fn add_lease(&self, mac: &str, ip: &str, subnet_id: u32, cltt: i64) {
        self.with_state(|s| {
            s.leases.push(json!({
                "hw-address": mac,
                "ip-address": ip,
                "subnet-id": subnet_id,
                "cltt": cltt,
            }));
        });
    }

    /// Store a lease entry exactly as given.
    pub fn add_raw_lease(&self, lease: Value) {
        self.with_state(|s| s.leases.push(lease));
    }

    /// Answer lease lookups with a bare object instead of a list.
    pub fn use_single_lease_object(&self) {
        self.with_state(|s| s.single_lease_object = true);
    }

    pub fn add_reservation(&self, subnet_id: u32, mac: &str, ip: Option<&str>) {
        self.with_state(|s| {
            s.reservations.push(FakeReservation {
                subnet_id,
                mac: mac.to_string(),
                ip: ip.map(str::to_string),
            });
        });
    }

    /// Answer `command` with a fixed response.
    pub fn override_command(&self, command: &str, result: i64, text: &str) {
        self.with_state(|s| {
            s.overrides.insert(command.to_string(), status(result, text));
        });
    }

    /// Reject `reservation-add` for `mac` with a generic error.
    pub fn fail_reservation_add(&self, mac: &str, text: &str) {
        self.with_state(|s| {
            s.failing_adds.insert(mac.to_string(), text.to_string());
        });
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.with_state(|s| s.unreachable = unreachable);
    }

    pub fn reservations(&self) -> Vec<FakeReservation> {
        self.state.lock().unwrap().reservations.clone()
    }

    pub fn calls(&self, command: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|r| r.command == command)
            .count()
    }

    pub fn last_request(&self, command: &str) -> Option<KeaRequest> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .rev()
            .find(|r| r.command == command)
            .cloned()
    }

    fn answer(state: &mut FakeState, request: &KeaRequest) -> KeaResponse {
        if let Some(response) = state.overrides.get(&request.command) {
            return response.clone();
        }

        match request.command.as_str() {
            "version-get" => ok("2.6.1", json!({"extended": "2.6.1"})),
            "subnet4-list" => {
                let subnets: Vec<Value> = state
                    .subnets
                    .iter()
                    .map(|s| json!({"id": s.id, "subnet": s.cidr}))
                    .collect();
                if subnets.is_empty() {
                    return status(3, "0 IPv4 subnets found");
                }
                ok(
                    &format!("{} IPv4 subnets found", subnets.len()),
                    json!({ "subnets": subnets }),
                )
            }
            "subnet4-get" => {
                let id = arg_u32(request, "/id");
                match state.subnets.iter().find(|s| s.id == id) {
                    Some(s) => {
                        let mut options = Vec::new();
                        if let Some(gw) = &s.gateway {
                            options.push(json!({"code": 3, "name": "routers", "data": gw}));
                        }
                        if !s.dns.is_empty() {
                            options.push(json!({"code": 6, "name": "domain-name-servers", "data": s.dns.join(", ")}));
                        }
                        ok(
                            "Info about IPv4 subnet found",
                            json!({"subnet4": [{"id": s.id, "subnet": s.cidr, "option-data": options}]}),
                        )
                    }
                    None => status(3, "No IPv4 subnet found"),
                }
            }
            "lease4-get-by-hw-address" => {
                let mac = arg_str(request, "/hw-address");
                let leases: Vec<Value> = state
                    .leases
                    .iter()
                    .filter(|l| l["hw-address"].as_str() == Some(mac.as_str()))
                    .cloned()
                    .collect();
                if leases.is_empty() {
                    status(3, "0 IPv4 lease(s) found.")
                } else if state.single_lease_object {
                    ok("1 IPv4 lease(s) found.", json!({ "leases": leases[0].clone() }))
                } else {
                    ok(
                        &format!("{} IPv4 lease(s) found.", leases.len()),
                        json!({ "leases": leases }),
                    )
                }
            }
            "reservation-get-by-id" => {
                let mac = arg_str(request, "/identifier");
                let hosts: Vec<Value> = state
                    .reservations
                    .iter()
                    .filter(|r| r.mac == mac)
                    .map(host_json)
                    .collect();
                if hosts.is_empty() {
                    return status(3, "0 IPv4 host(s) found.");
                }
                ok(
                    &format!("{} IPv4 host(s) found.", hosts.len()),
                    json!({ "hosts": hosts }),
                )
            }
            "reservation-get-all" => {
                let subnet_id = arg_u32(request, "/subnet-id");
                let hosts: Vec<Value> = state
                    .reservations
                    .iter()
                    .filter(|r| r.subnet_id == subnet_id)
                    .map(host_json)
                    .collect();
                ok(
                    &format!("{} IPv4 host(s) found.", hosts.len()),
                    json!({ "hosts": hosts }),
                )
            }
            "reservation-add" => {
                let subnet_id = arg_u32(request, "/reservation/subnet-id");
                let mac = arg_str(request, "/reservation/hw-address");
                let ip = Some(arg_str(request, "/reservation/ip-address")).filter(|ip| !ip.is_empty());
                if let Some(text) = state.failing_adds.get(&mac) {
                    return status(1, text);
                }
                if state
                    .reservations
                    .iter()
                    .any(|r| r.subnet_id == subnet_id && r.mac == mac)
                {
                    return status(1, "Host already exists.");
                }
                state.reservations.push(FakeReservation { subnet_id, mac, ip });
                status(0, "Host added.")
            }
            "reservation-del" => {
                let subnet_id = arg_u32(request, "/subnet-id");
                let mac = arg_str(request, "/identifier");
                let before = state.reservations.len();
                state
                    .reservations
                    .retain(|r| !(r.subnet_id == subnet_id && r.mac == mac));
                if state.reservations.len() == before {
                    status(1, "Host not deleted (not found).")
                } else {
                    status(0, "Host deleted.")
                }
            }
            other => status(2, &format!("'{other}' command not supported.")),
        }
    }
}

fn host_json(r: &FakeReservation) -> Value {
    let mut host = json!({"hw-address": r.mac, "subnet-id": r.subnet_id});
    if let Some(ip) = &r.ip {
        host["ip-address"] = Value::String(ip.clone());
    }
    host
}

#[async_trait]
impl CommandTransport for FakeKea {
    async fn send(&self, request: &KeaRequest) -> Result<KeaResponse, KeaError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.clone());
        if state.unreachable {
            return Err(KeaError::Transport {
                endpoint: "http://kea.invalid:8000/".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Self::answer(&mut state, request))
    }
}
