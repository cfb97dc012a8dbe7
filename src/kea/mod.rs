// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kea DHCP management over the Control Agent JSON command API.
//!
//! # Modules
//!
//! - [`client`] - HTTP(S) command transport with mTLS, basic auth and client caching
//! - [`decode`] - tolerant decoding of the several response shapes Kea emits
//! - [`tls`] - TLS material from files or Kubernetes Secrets
//! - [`service`] - subnet, lease and reservation operations
//! - [`options`] - DHCP option-data interpretation (gateway, DNS)
//! - [`types`] - command and response types
//!
//! # Example
//!
//! ```rust,no_run
//! use kea_operator::kea::client::{KeaClient, KeaClientConfig};
//! use kea_operator::kea::service::DhcpService;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), kea_operator::kea_errors::KeaError> {
//! let client = KeaClient::new(KeaClientConfig {
//!     endpoint: "kea-ctrl-agent.dhcp.svc".to_string(),
//!     ..KeaClientConfig::default()
//! })?;
//! let service = DhcpService::new(Arc::new(client), Some("dhcp4".to_string()));
//!
//! let subnet_id = service.resolve_subnet_id("10.20.0.0/24").await?;
//! service.ensure_reservation("00:11:22:33:44:55", subnet_id, None).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod decode;
pub mod options;
pub mod service;
pub mod tls;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{CommandTransport, KeaClient, KeaClientConfig};
pub use service::DhcpService;
