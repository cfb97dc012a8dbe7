// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Start-up checks run before the controller begins watching resources.
//!
//! Both checks are fatal: the operator refuses to start against a Kea endpoint
//! it cannot reach or a cluster that lacks the resources it reconciles.

use crate::constants::REQUIRED_CRDS;
use crate::kea::service::DhcpService;
use crate::kea_errors::text_indicates_unsupported;
use anyhow::{bail, Context as _, Result};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::{Api, Client};
use std::time::Duration;
use tracing::{info, warn};

/// Probe Kea with `version-get` until it answers.
///
/// A success result, or an answer saying the command is unsupported, proves
/// the control agent is reachable. Each attempt is bounded by `per_try`;
/// failed attempts are separated by `backoff`.
///
/// # Errors
///
/// Returns the last failure once `attempts` probes have failed.
pub async fn check_kea_connectivity(
    service: &DhcpService,
    attempts: u32,
    per_try: Duration,
    backoff: Duration,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match service.probe_version(per_try).await {
            Ok(response) if response.is_success() => {
                info!(attempt, version = %response.text, "Kea control agent is reachable");
                return Ok(());
            }
            Ok(response) if text_indicates_unsupported(&response.text) => {
                info!(attempt, text = %response.text, "Kea control agent is reachable (version-get unsupported)");
                return Ok(());
            }
            Ok(response) => {
                last_error = format!("result {}: {}", response.result, response.text);
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }

        warn!(attempt, attempts, error = %last_error, "Kea connectivity check failed");
        if attempt < attempts {
            tokio::time::sleep(backoff).await;
        }
    }

    bail!("Kea control agent unreachable after {attempts} attempts: {last_error}")
}

/// Fail unless every CRD the operator watches is installed.
///
/// # Errors
///
/// Returns an error naming the first missing CRD, or the API error.
pub async fn verify_crds(client: &Client) -> Result<()> {
    let api: Api<CustomResourceDefinition> = Api::all(client.clone());
    for name in REQUIRED_CRDS {
        let found = api
            .get_opt(name)
            .await
            .with_context(|| format!("failed to look up CRD {name}"))?;
        if found.is_none() {
            bail!("required CRD {name} is not installed");
        }
    }
    info!(crds = ?REQUIRED_CRDS, "Required CRDs are installed");
    Ok(())
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod startup_tests;
