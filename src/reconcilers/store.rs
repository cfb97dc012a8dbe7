// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cluster-state access used by the `NetworkConfiguration` reconciler.
//!
//! The reconciler talks to Kubernetes only through [`NetworkConfigStore`], so
//! its control flow can be exercised against an in-memory store in tests.
//! [`KubeStore`] is the production implementation.

use crate::constants::NETWORK_CONFIGURATION_FINALIZER;
use crate::crd::{NetworkConfiguration, NetworkConfigurationStatus, NetworkNamespace};
use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::debug;

/// Reads and writes of cluster state needed by one reconciliation pass.
#[async_trait]
pub trait NetworkConfigStore: Send + Sync {
    /// Add the operator's finalizer to `nc`.
    async fn add_finalizer(&self, nc: &NetworkConfiguration) -> Result<()>;

    /// Remove the operator's finalizer from `nc`.
    async fn remove_finalizer(&self, nc: &NetworkConfiguration) -> Result<()>;

    /// Replace the status of `nc`.
    async fn patch_status(
        &self,
        nc: &NetworkConfiguration,
        status: &NetworkConfigurationStatus,
    ) -> Result<()>;

    /// IPv4 prefix of the first `NetworkNamespace` in `namespace`, if any.
    async fn namespace_ipv4_prefix(&self, namespace: &str) -> Result<Option<String>>;
}

/// [`NetworkConfigStore`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NetworkConfigStore for KubeStore {
    async fn add_finalizer(&self, nc: &NetworkConfiguration) -> Result<()> {
        ensure_finalizer(&self.client, nc, NETWORK_CONFIGURATION_FINALIZER).await
    }

    async fn remove_finalizer(&self, nc: &NetworkConfiguration) -> Result<()> {
        remove_finalizer(&self.client, nc, NETWORK_CONFIGURATION_FINALIZER).await
    }

    async fn patch_status(
        &self,
        nc: &NetworkConfiguration,
        status: &NetworkConfigurationStatus,
    ) -> Result<()> {
        let namespace = nc.namespace().unwrap_or_default();
        let name = nc.name_any();
        let api: Api<NetworkConfiguration> = Api::namespaced(self.client.clone(), &namespace);

        let patch = json!({ "status": status });
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("failed to patch status of {namespace}/{name}"))?;

        debug!(
            namespace = %namespace,
            name = %name,
            phase = ?status.phase,
            "Patched NetworkConfiguration status"
        );
        Ok(())
    }

    async fn namespace_ipv4_prefix(&self, namespace: &str) -> Result<Option<String>> {
        let api: Api<NetworkNamespace> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .with_context(|| format!("failed to list NetworkNamespaces in {namespace}"))?;

        Ok(list
            .items
            .into_iter()
            .next()
            .and_then(|nn| nn.status)
            .and_then(|s| s.ipv4_prefix)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()))
    }
}
