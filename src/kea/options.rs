// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DHCPv4 option-data interpretation.
//!
//! Kea lists subnet options as `{code, name, data}` entries where either the
//! code or the name may be missing. A small lookup table maps the options we
//! project into status onto their meaning.

use super::types::OptionData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OptionTarget {
    Gateway,
    Dns,
}

/// `(code, name, target)` for every option that feeds interface status.
const OPTION_TABLE: &[(u32, &str, OptionTarget)] = &[
    (3, "routers", OptionTarget::Gateway),
    (6, "domain-name-servers", OptionTarget::Dns),
];

fn target_of(option: &OptionData) -> Option<OptionTarget> {
    OPTION_TABLE
        .iter()
        .find(|(code, name, _)| {
            option.code == Some(*code) || option.name.as_deref() == Some(*name)
        })
        .map(|(_, _, target)| *target)
}

fn split_list(data: &str) -> impl Iterator<Item = String> + '_ {
    data.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Extract the gateway (first router) and DNS servers from option data.
///
/// Missing options are not an error: the gateway is `None` and the DNS list empty.
#[must_use]
pub fn gateway_and_dns(options: &[OptionData]) -> (Option<String>, Vec<String>) {
    let mut gateway = None;
    let mut dns = Vec::new();

    for option in options {
        let Some(data) = option.data.as_deref() else {
            continue;
        };
        match target_of(option) {
            Some(OptionTarget::Gateway) if gateway.is_none() => {
                gateway = split_list(data).next();
            }
            Some(OptionTarget::Dns) if dns.is_empty() => {
                dns = split_list(data).collect();
            }
            _ => {}
        }
    }

    (gateway, dns)
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod options_tests;
