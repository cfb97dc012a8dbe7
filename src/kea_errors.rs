// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for Kea Control Agent operations.
//!
//! One enum covers the three failure classes of the command channel:
//! - local validation failures that never reach the network
//! - transport failures (connection, TLS, deadline)
//! - remote failures carried in a Kea response (`result != 0`) or a payload
//!   that could not be decoded at all
//!
//! "Not found" answers for leases and reservations are not errors; the
//! service layer returns `Option`/`bool` for those.

use crate::status_reasons::{
    REASON_INVALID_CONFIGURATION, REASON_KEA_COMMAND_FAILED, REASON_KEA_MALFORMED_RESPONSE,
    REASON_KEA_TIMEOUT, REASON_KEA_UNREACHABLE, REASON_KEA_UNSUPPORTED, REASON_SUBNET_NOT_FOUND,
};
use thiserror::Error;

/// Errors returned by the Kea command transport and the DHCP service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeaError {
    /// Input is not a 6-octet hardware address after canonicalization.
    #[error("invalid MAC address '{mac}'")]
    InvalidMac {
        /// The offending input, as given
        mac: String,
    },

    /// Input is not a valid IPv4 CIDR.
    #[error("invalid CIDR '{cidr}': {reason}")]
    InvalidCidr { cidr: String, reason: String },

    /// The configured endpoint cannot be turned into a URL.
    #[error("invalid Kea endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// CA bundle or client identity could not be loaded.
    #[error("TLS configuration error: {reason}")]
    TlsConfig { reason: String },

    /// Connection-level failure talking to the control agent.
    #[error("request to Kea at {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The request did not complete within its deadline.
    #[error("request to Kea at {endpoint} timed out after {timeout_ms}ms")]
    Timeout { endpoint: String, timeout_ms: u128 },

    /// The response body matched none of the known response shapes.
    #[error("unrecognized Kea response format (HTTP {status})")]
    MalformedResponse {
        /// HTTP status of the response
        status: u16,
    },

    /// The response decoded but its `arguments` lacked what the command needs.
    #[error("unexpected '{command}' response: {reason}")]
    UnexpectedShape { command: String, reason: String },

    /// Kea answered with a non-success result code.
    #[error("Kea command '{command}' failed (result {result}): {text}")]
    Remote {
        command: String,
        result: i64,
        text: String,
    },

    /// Kea rejected the command as not supported by the running DHCP engine.
    #[error("Kea command '{command}' not supported: {text}")]
    Unsupported { command: String, text: String },

    /// No Kea subnet has a CIDR equal to the requested prefix.
    #[error("no Kea subnet found for CIDR {cidr}")]
    SubnetNotFound { cidr: String },
}

impl KeaError {
    /// Returns true for the non-retryable "command not supported" failure.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Returns the Kubernetes status reason code for this error.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::InvalidMac { .. }
            | Self::InvalidCidr { .. }
            | Self::InvalidEndpoint { .. }
            | Self::TlsConfig { .. } => REASON_INVALID_CONFIGURATION,
            Self::Transport { .. } => REASON_KEA_UNREACHABLE,
            Self::Timeout { .. } => REASON_KEA_TIMEOUT,
            Self::MalformedResponse { .. } | Self::UnexpectedShape { .. } => {
                REASON_KEA_MALFORMED_RESPONSE
            }
            Self::Remote { .. } => REASON_KEA_COMMAND_FAILED,
            Self::Unsupported { .. } => REASON_KEA_UNSUPPORTED,
            Self::SubnetNotFound { .. } => REASON_SUBNET_NOT_FOUND,
        }
    }
}

/// Returns true when a Kea response text says the command is not supported.
#[must_use]
pub fn text_indicates_unsupported(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("not supported") || lower.contains("unsupported")
}

/// Returns true when a Kea response text reports that nothing matched.
#[must_use]
pub fn text_indicates_not_found(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("not found") || lower.contains("no host") || lower.contains("0 ipv4 host")
}

#[cfg(test)]
#[path = "kea_errors_tests.rs"]
mod kea_errors_tests;
