// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation for `NetworkConfiguration` resources.
//!
//! # Reconciliation Architecture
//!
//! The operator follows the standard Kubernetes controller pattern:
//!
//! 1. **Watch** - `kube::runtime::Controller` delivers resource changes
//! 2. **Reconcile** - compare declared MAC addresses with Kea reservations
//! 3. **Update** - add the missing reservations through the Kea control agent
//! 4. **Status** - report the outcome on the resource
//!
//! # Modules
//!
//! - [`networkconfiguration`] - the reconciliation pass itself
//! - [`store`] - cluster-state seam and its Kubernetes implementation
//! - [`finalizers`] - finalizer patches
//! - [`status`] - condition and status construction
//!
//! # Example
//!
//! ```rust,no_run
//! use kea_operator::context::Context;
//! use kea_operator::crd::NetworkConfiguration;
//! use kea_operator::reconcilers::reconcile_network_configuration;
//!
//! async fn reconcile(ctx: &Context, nc: &NetworkConfiguration) -> anyhow::Result<()> {
//!     let action = reconcile_network_configuration(ctx, nc).await?;
//!     println!("next: {action:?}");
//!     Ok(())
//! }
//! ```

pub mod finalizers;
pub mod networkconfiguration;
pub mod status;
pub mod store;

#[cfg(test)]
mod networkconfiguration_tests;

pub use networkconfiguration::{reconcile_network_configuration, ReconcileAction};
pub use store::{KubeStore, NetworkConfigStore};
