// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context passed to every reconciliation.
//!
//! One `Context` is built at start-up and shared behind an `Arc` by all
//! concurrent reconciliations. Nothing in it is mutated after construction.

use crate::config::ReservationPolicy;
use crate::kea::service::DhcpService;
use crate::reconcilers::store::NetworkConfigStore;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Context {
    /// Cluster-state reads and writes
    pub store: Arc<dyn NetworkConfigStore>,

    /// Kea subnet, lease and reservation operations
    pub dhcp: Arc<DhcpService>,

    /// Requeue delay after a successful pass
    pub reconcile_interval: Duration,

    /// Handling of MACs that hold no lease in the namespace prefix
    pub policy: ReservationPolicy,
}

impl Context {
    #[must_use]
    pub fn new(
        store: Arc<dyn NetworkConfigStore>,
        dhcp: Arc<DhcpService>,
        reconcile_interval: Duration,
        policy: ReservationPolicy,
    ) -> Self {
        Self {
            store,
            dhcp,
            reconcile_interval,
            policy,
        }
    }
}
