// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator configuration, parsed from the command line or environment.
//!
//! Every flag has an environment-variable twin (`--kea-url` / `KEA_URL`), so the
//! operator can be configured entirely from a Deployment's `env` block.

use crate::constants::{
    DEFAULT_KEA_TIMEOUT_SECS, DEFAULT_METRICS_ADDR, DEFAULT_POLL_INTERVAL_SECS,
};
use crate::kea::client::{BasicAuth, KeaClientConfig};
use crate::kea::tls::TlsSettings;
use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// What to do with a MAC address that has no lease inside the namespace prefix.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReservationPolicy {
    /// Reserve the MAC without an address; Kea allocates one on the next DHCP request.
    #[default]
    AllowMacOnly,
    /// Report the MAC as failed until a lease inside the prefix exists.
    RequireLease,
}

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[clap(author, name = "kea-operator", bin_name = "kea-operator", about, long_about = None)]
/// Keeps Kea DHCP reservations in sync with `NetworkConfiguration` resources.
pub struct OperatorConfig {
    /// Kea control agent URL (preferred over --kea-base-url)
    #[clap(long, env = "KEA_URL")]
    pub kea_url: Option<String>,

    /// Kea control agent host or URL without a port
    #[clap(long, env = "KEA_BASE_URL")]
    pub kea_base_url: Option<String>,

    /// Port used when the endpoint names none
    #[clap(long, env = "KEA_PORT")]
    pub kea_port: Option<u16>,

    /// Standby control agent URL (logged; failover is handled outside the operator)
    #[clap(long, env = "KEA_SECONDARY_URL")]
    pub kea_secondary_url: Option<String>,

    /// Daemon the control agent forwards commands to (e.g. dhcp4)
    #[clap(long, env = "KEA_SERVICE")]
    pub kea_service: Option<String>,

    /// Per-request deadline in seconds
    #[clap(long, env = "KEA_TIMEOUT_SECONDS", default_value_t = DEFAULT_KEA_TIMEOUT_SECS)]
    pub kea_timeout_seconds: u64,

    /// Close connections after each request
    #[clap(long, env = "KEA_DISABLE_KEEPALIVES", action = ArgAction::Set, default_value_t = true)]
    pub kea_disable_keepalives: bool,

    /// Read the KEA_TLS_* settings
    #[clap(long, env = "KEA_TLS_ENABLED", action = ArgAction::Set, default_value_t = false)]
    pub kea_tls_enabled: bool,

    /// CA bundle used to verify the control agent
    #[clap(long, env = "KEA_TLS_CA_FILE")]
    pub kea_tls_ca_file: Option<PathBuf>,

    /// Client certificate for mutual TLS
    #[clap(long, env = "KEA_TLS_CERT_FILE")]
    pub kea_tls_cert_file: Option<PathBuf>,

    /// Client private key for mutual TLS
    #[clap(long, env = "KEA_TLS_KEY_FILE")]
    pub kea_tls_key_file: Option<PathBuf>,

    /// Skip server certificate verification
    #[clap(long, env = "KEA_TLS_INSECURE", action = ArgAction::Set, default_value_t = false)]
    pub kea_tls_insecure: bool,

    /// Expected server name in the control agent's certificate
    #[clap(long, env = "KEA_TLS_SERVER_NAME")]
    pub kea_tls_server_name: Option<String>,

    /// Secret holding ca.crt, tls.crt and tls.key
    #[clap(long, env = "KEA_TLS_SECRET_NAME")]
    pub kea_tls_secret_name: Option<String>,

    /// Namespace of the TLS secret (defaults to the operator's namespace)
    #[clap(long, env = "KEA_TLS_SECRET_NAMESPACE")]
    pub kea_tls_secret_namespace: Option<String>,

    /// HTTP basic auth user, used when no client certificate is configured
    #[clap(long, env = "KEA_BASIC_AUTH_USERNAME")]
    pub kea_basic_auth_username: Option<String>,

    /// HTTP basic auth password
    #[clap(long, env = "KEA_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    pub kea_basic_auth_password: Option<String>,

    /// Seconds between reconciliations of a healthy resource
    #[clap(long, env = "RECONCILE_INTERVAL_SECONDS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub reconcile_interval_seconds: u64,

    /// Handling of MAC addresses without a lease in the namespace prefix
    #[clap(long, env = "RESERVATION_POLICY", value_enum, default_value_t = ReservationPolicy::AllowMacOnly)]
    pub reservation_policy: ReservationPolicy,

    /// Address of the metrics and health endpoint
    #[clap(long, env = "METRICS_ADDR", default_value = DEFAULT_METRICS_ADDR)]
    pub metrics_addr: SocketAddr,
}

impl OperatorConfig {
    /// The control agent endpoint: `--kea-url`, else `--kea-base-url`.
    ///
    /// # Errors
    ///
    /// Returns an error when neither is set.
    pub fn endpoint(&self) -> Result<String> {
        self.kea_url
            .iter()
            .chain(self.kea_base_url.iter())
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("KEA_URL or KEA_BASE_URL must be set"))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.kea_timeout_seconds)
    }

    #[must_use]
    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_seconds)
    }

    /// File-based TLS settings. Empty unless `--kea-tls-enabled` is set.
    #[must_use]
    pub fn tls_settings(&self) -> TlsSettings {
        if !self.kea_tls_enabled {
            return TlsSettings::default();
        }
        TlsSettings {
            ca_cert_path: self.kea_tls_ca_file.clone(),
            client_cert_path: self.kea_tls_cert_file.clone(),
            client_key_path: self.kea_tls_key_file.clone(),
            insecure_skip_verify: self.kea_tls_insecure,
            server_name: self.kea_tls_server_name.clone(),
            ..TlsSettings::default()
        }
    }

    /// Build the client configuration, overlaying PEM material read from a Secret.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is configured or only half of the
    /// basic-auth credentials are given.
    pub fn client_config(&self, secret_tls: Option<TlsSettings>) -> Result<KeaClientConfig> {
        let mut tls = self.tls_settings();
        if let Some(secret) = secret_tls {
            tls.ca_pem = secret.ca_pem;
            tls.client_cert_pem = secret.client_cert_pem;
            tls.client_key_pem = secret.client_key_pem;
        }

        let basic_auth = match (&self.kea_basic_auth_username, &self.kea_basic_auth_password) {
            (Some(username), Some(password)) => Some(BasicAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => None,
            _ => bail!("KEA_BASIC_AUTH_USERNAME and KEA_BASIC_AUTH_PASSWORD must be set together"),
        };

        Ok(KeaClientConfig {
            endpoint: self.endpoint()?,
            port: self.kea_port,
            secondary_endpoint: self.kea_secondary_url.clone(),
            timeout: self.timeout(),
            disable_keepalives: self.kea_disable_keepalives,
            tls,
            basic_auth,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
