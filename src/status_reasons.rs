// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for `NetworkConfiguration`.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why the
//! `Ready` condition has a particular status.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   phase: Ready
//!   status: Success
//!   message: "2 MAC reservations configured (1 with IP, 1 will get IP on DHCP request)"
//!   conditions:
//!     - type: Ready
//!       status: "True"
//!       reason: Configured
//!       observedGeneration: 3
//! ```

// ============================================================================
// Lifecycle Reasons
// ============================================================================

/// A reconciliation pass for the current generation has started.
pub const REASON_RECONCILING: &str = "Reconciling";

/// Every declared MAC address holds a DHCP reservation.
pub const REASON_CONFIGURED: &str = "Configured";

/// No valid MAC addresses are declared, so there is nothing to reserve.
pub const REASON_NO_MAC_ADDRESSES: &str = "NoMACAddresses";

/// Generic failure; the message carries the details.
pub const REASON_ERROR: &str = "Error";

// ============================================================================
// Dependency Reasons
// ============================================================================

/// No `NetworkNamespace` (or no IPv4 prefix on it) exists in the namespace.
pub const REASON_NETWORK_NAMESPACE_NOT_FOUND: &str = "NetworkNamespaceNotFound";

/// At least one MAC reservation could not be ensured.
///
/// The condition message lists each failing MAC with its error.
pub const REASON_RESERVATION_FAILED: &str = "ReservationFailed";

// ============================================================================
// Kea Reasons
// ============================================================================

/// Kea has no subnet whose CIDR equals the namespace prefix.
pub const REASON_SUBNET_NOT_FOUND: &str = "SubnetNotFound";

/// Kea rejected a command as not supported. Polling stops until the resource changes.
pub const REASON_KEA_UNSUPPORTED: &str = "KeaCommandUnsupported";

/// Kea answered a command with a non-success result.
pub const REASON_KEA_COMMAND_FAILED: &str = "KeaCommandFailed";

/// The Kea Control Agent could not be reached.
pub const REASON_KEA_UNREACHABLE: &str = "KeaUnreachable";

/// A Kea request exceeded its deadline.
pub const REASON_KEA_TIMEOUT: &str = "KeaTimeout";

/// Kea answered with a payload that matched no known response shape.
pub const REASON_KEA_MALFORMED_RESPONSE: &str = "KeaMalformedResponse";

/// Local validation failed (MAC address, CIDR, endpoint or TLS material).
pub const REASON_INVALID_CONFIGURATION: &str = "InvalidConfiguration";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
