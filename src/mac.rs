// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! MAC address canonicalization.
//!
//! Every hardware address is reduced to lowercase, colon-separated form
//! (`aa:bb:cc:dd:ee:ff`) before it is compared or sent to Kea.

use crate::crd::NetworkInterface;
use crate::kea_errors::KeaError;
use mac_address::MacAddress;
use std::str::FromStr;
use tracing::debug;

/// Canonicalize a MAC address.
///
/// Trims whitespace, lowercases, and turns `-` separators into `:`. The
/// dotted form (`aabb.ccdd.eeff`) is also accepted. The result must be six
/// two-digit hex octets.
///
/// # Errors
///
/// Returns `KeaError::InvalidMac` if the input is not a 6-octet hardware address.
///
/// # Example
///
/// ```rust
/// # use kea_operator::mac::canonicalize;
/// assert_eq!(canonicalize(" AA-BB-CC-DD-EE-FF ").unwrap(), "aa:bb:cc:dd:ee:ff");
/// assert!(canonicalize("not-a-mac").is_err());
/// ```
pub fn canonicalize(input: &str) -> Result<String, KeaError> {
    let mut normalized = input.trim().to_lowercase().replace('-', ":");
    if normalized.contains('.') {
        normalized = undot(&normalized).ok_or_else(|| KeaError::InvalidMac {
            mac: input.to_string(),
        })?;
    }

    let well_formed = normalized.split(':').count() == 6
        && normalized
            .split(':')
            .all(|octet| octet.len() == 2 && octet.chars().all(|c| c.is_ascii_hexdigit()));
    if !well_formed {
        return Err(KeaError::InvalidMac {
            mac: input.to_string(),
        });
    }

    let parsed = MacAddress::from_str(&normalized).map_err(|_| KeaError::InvalidMac {
        mac: input.to_string(),
    })?;

    Ok(parsed
        .bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":"))
}

/// `aabb.ccdd.eeff` to `aa:bb:cc:dd:ee:ff`.
fn undot(dotted: &str) -> Option<String> {
    let groups: Vec<&str> = dotted.split('.').collect();
    if groups.len() != 3 || groups.iter().any(|g| g.len() != 4 || !g.is_ascii()) {
        return None;
    }
    Some(
        groups
            .iter()
            .flat_map(|g| [&g[..2], &g[2..]])
            .collect::<Vec<_>>()
            .join(":"),
    )
}

/// Extract canonical MAC addresses from declared interfaces.
///
/// Invalid or empty addresses are skipped with a debug log. Duplicates are
/// removed; the first occurrence keeps its position.
#[must_use]
pub fn extract_macs(interfaces: &[NetworkInterface]) -> Vec<String> {
    let mut macs: Vec<String> = Vec::with_capacity(interfaces.len());

    for iface in interfaces {
        if iface.mac_address.trim().is_empty() {
            continue;
        }
        match canonicalize(&iface.mac_address) {
            Ok(mac) => {
                if !macs.contains(&mac) {
                    macs.push(mac);
                }
            }
            Err(e) => {
                debug!(interface = %iface.name, error = %e, "Skipping interface with invalid MAC address");
            }
        }
    }

    macs
}

#[cfg(test)]
#[path = "mac_tests.rs"]
mod mac_tests;
