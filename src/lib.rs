// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kea-operator - Kea DHCP reservations for Kubernetes
//!
//! A Kubernetes operator that keeps host reservations on a Kea DHCP server in
//! sync with `NetworkConfiguration` custom resources.
//!
//! ## Overview
//!
//! For every `NetworkConfiguration` the operator:
//!
//! - resolves the IPv4 prefix of the namespace's `NetworkNamespace` to a Kea subnet
//! - reserves each declared MAC address in that subnet, pinning the currently
//!   leased address when one exists
//! - reports addresses, gateway and DNS servers back in status
//! - removes the reservations when the resource is deleted
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - reconciliation logic
//! - [`kea`] - Kea control agent client and DHCP operations
//! - [`config`] - command-line and environment configuration
//! - [`startup`] - connectivity and CRD checks run before the controller starts
//! - [`metrics`] - Prometheus metrics and the HTTP endpoint serving them
//!
//! ## Example
//!
//! ```rust,no_run
//! use kea_operator::mac::canonicalize;
//!
//! assert_eq!(canonicalize("AA-BB-CC-DD-EE-FF").unwrap(), "aa:bb:cc:dd:ee:ff");
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod crd;
pub mod kea;
pub mod kea_errors;
pub mod mac;
pub mod metrics;
pub mod reconcilers;
pub mod startup;
pub mod status_reasons;
