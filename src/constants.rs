// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Kea operator.
//!
//! Numeric and string constants used throughout the codebase, grouped by category.

use std::time::Duration;

// ============================================================================
// API Constants
// ============================================================================

/// API group of the network CRDs
pub const API_GROUP: &str = "vitistack.io";

/// API version of the network CRDs
pub const API_VERSION: &str = "v1alpha1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "vitistack.io/v1alpha1";

/// Kind name for `NetworkConfiguration` resource
pub const KIND_NETWORK_CONFIGURATION: &str = "NetworkConfiguration";

/// Kind name for `NetworkNamespace` resource
pub const KIND_NETWORK_NAMESPACE: &str = "NetworkNamespace";

/// CRD names that must be installed before the controller starts
pub const REQUIRED_CRDS: [&str; 2] = [
    "networkconfigurations.vitistack.io",
    "networknamespaces.vitistack.io",
];

/// Finalizer guarding reservation cleanup on `NetworkConfiguration` deletion
pub const NETWORK_CONFIGURATION_FINALIZER: &str = "networkconfiguration.finalizers.vitistack.io";

// ============================================================================
// Status Values
// ============================================================================

/// Condition type carried by every `NetworkConfiguration`
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Kubernetes condition status "True"
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Kubernetes condition status "False"
pub const CONDITION_STATUS_FALSE: &str = "False";

/// `status.phase` while a pass is in flight
pub const PHASE_RECONCILING: &str = "Reconciling";

/// `status.phase` after a successful pass
pub const PHASE_READY: &str = "Ready";

/// `status.phase` after a failed pass
pub const PHASE_ERROR: &str = "Error";

/// `status.status` while a pass is in flight
pub const STATUS_IN_PROGRESS: &str = "InProgress";

/// `status.status` after a successful pass
pub const STATUS_SUCCESS: &str = "Success";

/// `status.status` after a failed pass
pub const STATUS_FAILED: &str = "Failed";

// ============================================================================
// Kea Control Agent Constants
// ============================================================================

/// Port the Kea Control Agent listens on when the endpoint does not name one
pub const DEFAULT_KEA_PORT: u16 = 8000;

/// Default per-request deadline in seconds
pub const DEFAULT_KEA_TIMEOUT_SECS: u64 = 10;

/// Kea result code: command succeeded
pub const KEA_RESULT_SUCCESS: i64 = 0;

/// Kea result code: command not supported
pub const KEA_RESULT_UNSUPPORTED: i64 = 2;

/// Kea result code: command succeeded but found nothing
pub const KEA_RESULT_EMPTY: i64 = 3;

/// Identifier type used for every host reservation
pub const KEA_IDENTIFIER_HW_ADDRESS: &str = "hw-address";

/// Apply reservation changes to both the memory and persistent host stores
pub const KEA_OPERATION_TARGET_ALL: &str = "all";

/// File names tried, in order, when the configured client certificate cannot be loaded
pub const CLIENT_CERT_FALLBACK_PAIRS: [(&str, &str); 2] =
    [("client.crt", "client.key"), ("tls.crt", "tls.key")];

/// Secret keys holding TLS material
pub const SECRET_KEY_CA: &str = "ca.crt";
pub const SECRET_KEY_CERT: &str = "tls.crt";
pub const SECRET_KEY_KEY: &str = "tls.key";

/// Namespace file mounted into every pod with a service account
pub const SERVICE_ACCOUNT_NAMESPACE_FILE: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

// ============================================================================
// Controller Timing Constants
// ============================================================================

/// Poll interval after a successful reconciliation
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Requeue delay when the namespace prefix or subnet cannot be resolved
pub const REQUEUE_RESOLVE_FAILURE_SECS: u64 = 15;

/// Requeue delay when at least one MAC reservation failed
pub const REQUEUE_MAC_FAILURE_SECS: u64 = 15;

/// Requeue delay applied by the controller error policy
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

// ============================================================================
// Startup Probe Constants
// ============================================================================

/// Connectivity probe attempts before the process gives up
pub const STARTUP_PROBE_ATTEMPTS: u32 = 3;

/// Deadline for each connectivity probe attempt
pub const STARTUP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay between connectivity probe attempts
pub const STARTUP_PROBE_BACKOFF: Duration = Duration::from_secs(2);

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of tokio worker threads
pub const TOKIO_WORKER_THREADS: usize = 4;

/// Default bind address of the metrics/health HTTP server
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

/// Path serving Prometheus metrics
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path serving the liveness probe
pub const HEALTH_SERVER_PATH: &str = "/healthz";
