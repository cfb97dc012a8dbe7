// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP command channel to the Kea Control Agent.
//!
//! [`KeaClient`] owns one `reqwest::Client`, built lazily and rebuilt only when
//! the SHA-256 fingerprint of its configuration changes. The per-request
//! deadline is applied on every call, so changing the timeout never forces a
//! rebuild.

use super::decode::decode_response;
use super::tls::TlsSettings;
use super::types::{KeaRequest, KeaResponse};
use crate::constants::{DEFAULT_KEA_PORT, DEFAULT_KEA_TIMEOUT_SECS};
use crate::kea_errors::KeaError;
use crate::metrics;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Sends commands to a Kea control endpoint.
///
/// The DHCP service is written against this trait so tests can substitute an
/// in-memory implementation.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Send a command using the transport's default deadline.
    async fn send(&self, request: &KeaRequest) -> Result<KeaResponse, KeaError>;

    /// Send a command that must complete within `deadline`.
    async fn send_with_deadline(
        &self,
        request: &KeaRequest,
        deadline: Duration,
    ) -> Result<KeaResponse, KeaError> {
        tokio::time::timeout(deadline, self.send(request))
            .await
            .map_err(|_| KeaError::Timeout {
                endpoint: String::new(),
                timeout_ms: deadline.as_millis(),
            })?
    }
}

/// HTTP basic-auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for [`KeaClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeaClientConfig {
    /// Full URL (`https://kea:8000`) or bare `host[:port]`.
    pub endpoint: String,
    /// Port used when the endpoint names none.
    pub port: Option<u16>,
    /// Standby control agent. Recorded only; failover happens outside this operator.
    pub secondary_endpoint: Option<String>,
    pub timeout: Duration,
    pub disable_keepalives: bool,
    pub tls: TlsSettings,
    pub basic_auth: Option<BasicAuth>,
}

impl Default for KeaClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            port: None,
            secondary_endpoint: None,
            timeout: Duration::from_secs(DEFAULT_KEA_TIMEOUT_SECS),
            disable_keepalives: true,
            tls: TlsSettings::default(),
            basic_auth: None,
        }
    }
}

impl KeaClientConfig {
    /// SHA-256 over every field that shapes the HTTP client. The timeout is excluded.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut field = |name: &str, value: &[u8]| {
            hasher.update(name.as_bytes());
            hasher.update((value.len() as u64).to_be_bytes());
            hasher.update(value);
        };

        let path_bytes = |p: &Option<std::path::PathBuf>| {
            p.as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        field("endpoint", self.endpoint.as_bytes());
        field("port", &self.port.unwrap_or(0).to_be_bytes());
        field("ca_path", path_bytes(&self.tls.ca_cert_path).as_bytes());
        field("cert_path", path_bytes(&self.tls.client_cert_path).as_bytes());
        field("key_path", path_bytes(&self.tls.client_key_path).as_bytes());
        field("ca_pem", self.tls.ca_pem.as_deref().unwrap_or_default());
        field("cert_pem", self.tls.client_cert_pem.as_deref().unwrap_or_default());
        field("key_pem", self.tls.client_key_pem.as_deref().unwrap_or_default());
        field("insecure", &[u8::from(self.tls.insecure_skip_verify)]);
        field(
            "server_name",
            self.tls.server_name.as_deref().unwrap_or_default().as_bytes(),
        );
        field("no_keepalive", &[u8::from(self.disable_keepalives)]);

        format!("{:x}", hasher.finalize())
    }
}

/// Returns true if the authority part (after any scheme) names a port.
fn has_explicit_port(endpoint: &str) -> bool {
    let rest = endpoint.split_once("://").map_or(endpoint, |(_, rest)| rest);
    let authority = rest.split('/').next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.rfind(']') {
        Some(end) => host_port[end..].contains(':'),
        None => host_port.contains(':'),
    }
}

/// Normalize a configured endpoint into the URL commands are POSTed to.
///
/// Adds `https://` when TLS material is configured and `http://` otherwise,
/// appends the port when the endpoint has none, and makes the path end in `/`.
///
/// # Errors
///
/// Returns `KeaError::InvalidEndpoint` for an empty or unparsable endpoint.
///
/// # Example
///
/// ```rust
/// # use kea_operator::kea::client::normalize_endpoint;
/// let url = normalize_endpoint("kea-ctrl-agent/", None, false).unwrap();
/// assert_eq!(url.as_str(), "http://kea-ctrl-agent:8000/");
/// ```
pub fn normalize_endpoint(endpoint: &str, port: Option<u16>, use_tls: bool) -> Result<Url, KeaError> {
    let trimmed = endpoint.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(KeaError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint is empty".to_string(),
        });
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else if use_tls {
        format!("https://{trimmed}")
    } else {
        format!("http://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme).map_err(|e| KeaError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(KeaError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: "endpoint has no host".to_string(),
        });
    }

    if !has_explicit_port(&with_scheme) {
        url.set_port(Some(port.unwrap_or(DEFAULT_KEA_PORT)))
            .map_err(|()| KeaError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                reason: "endpoint cannot carry a port".to_string(),
            })?;
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

struct CachedHttp {
    fingerprint: String,
    client: HttpClient,
    url: Url,
}

/// Kea Control Agent client.
///
/// Safe to share across reconciliations behind an `Arc`. No lock is held
/// while a request is in flight.
pub struct KeaClient {
    config: RwLock<KeaClientConfig>,
    cached: RwLock<Option<CachedHttp>>,
    builds: AtomicUsize,
}

impl KeaClient {
    /// Create a client. The HTTP client itself is built on first use.
    ///
    /// # Errors
    ///
    /// Returns `KeaError::InvalidEndpoint` if the endpoint cannot be normalized.
    pub fn new(config: KeaClientConfig) -> Result<Self, KeaError> {
        let url = normalize_endpoint(&config.endpoint, config.port, config.tls.has_tls_material())?;
        info!(
            endpoint = %url,
            secondary = ?config.secondary_endpoint,
            timeout = ?config.timeout,
            tls = config.tls.has_tls_material(),
            basic_auth = config.basic_auth.is_some(),
            "Configured Kea control agent client"
        );
        Ok(Self {
            config: RwLock::new(config),
            cached: RwLock::new(None),
            builds: AtomicUsize::new(0),
        })
    }

    /// Replace the connection settings. The HTTP client is rebuilt on the next
    /// request only if the fingerprint changed.
    pub fn reconfigure(&self, config: KeaClientConfig) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    #[must_use]
    pub fn config(&self) -> KeaClientConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of times the underlying HTTP client has been built.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    async fn http_client(&self, config: &KeaClientConfig) -> Result<(HttpClient, Url), KeaError> {
        let fingerprint = config.fingerprint();
        {
            let cached = self.cached.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(c) = cached.as_ref().filter(|c| c.fingerprint == fingerprint) {
                return Ok((c.client.clone(), c.url.clone()));
            }
        }

        let (client, url) = build_http_client(config).await?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        debug!(fingerprint = %fingerprint, url = %url, "Built Kea HTTP client");

        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(CachedHttp {
            fingerprint,
            client: client.clone(),
            url: url.clone(),
        });
        Ok((client, url))
    }
}

async fn build_http_client(config: &KeaClientConfig) -> Result<(HttpClient, Url), KeaError> {
    let tls = &config.tls;
    let mut url = normalize_endpoint(&config.endpoint, config.port, tls.has_tls_material())?;
    let mut builder = HttpClient::builder();

    if config.disable_keepalives {
        builder = builder.pool_max_idle_per_host(0);
    }

    if let Some(ca) = tls.load_ca()? {
        let certs = reqwest::Certificate::from_pem_bundle(&ca).map_err(|e| KeaError::TlsConfig {
            reason: format!("invalid CA bundle: {e}"),
        })?;
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    if let Some(pem) = tls.load_identity()? {
        let identity = reqwest::Identity::from_pem(&pem).map_err(|e| KeaError::TlsConfig {
            reason: format!("invalid client certificate/key: {e}"),
        })?;
        builder = builder.identity(identity);
    }

    if tls.insecure_skip_verify {
        warn!("Kea TLS server certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    // Address requests to the expected server name and pin its resolution to
    // the configured endpoint, so SNI and verification use that name.
    if let Some(server_name) = tls.server_name.as_deref().filter(|s| !s.is_empty()) {
        if url.scheme() == "https" {
            let host = url.host_str().unwrap_or_default().to_string();
            let port = url.port_or_known_default().unwrap_or(DEFAULT_KEA_PORT);
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
                .await
                .map_err(|e| KeaError::Transport {
                    endpoint: url.to_string(),
                    reason: format!("failed to resolve {host}: {e}"),
                })?
                .collect();
            builder = builder.resolve_to_addrs(server_name, &addrs);
            url.set_host(Some(server_name))
                .map_err(|e| KeaError::InvalidEndpoint {
                    endpoint: config.endpoint.clone(),
                    reason: format!("invalid server name {server_name}: {e}"),
                })?;
        }
    }

    let client = builder.build().map_err(|e| KeaError::TlsConfig {
        reason: format!("failed to build HTTP client: {e}"),
    })?;
    Ok((client, url))
}

fn classify_reqwest_error(url: &Url, deadline: Duration, e: &reqwest::Error) -> KeaError {
    if e.is_timeout() {
        KeaError::Timeout {
            endpoint: url.to_string(),
            timeout_ms: deadline.as_millis(),
        }
    } else {
        KeaError::Transport {
            endpoint: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl CommandTransport for KeaClient {
    async fn send(&self, request: &KeaRequest) -> Result<KeaResponse, KeaError> {
        let deadline = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .timeout;
        self.send_with_deadline(request, deadline).await
    }

    async fn send_with_deadline(
        &self,
        request: &KeaRequest,
        deadline: Duration,
    ) -> Result<KeaResponse, KeaError> {
        let config = self.config();
        let (client, url) = self.http_client(&config).await?;
        let start = Instant::now();

        debug!(command = %request.command, url = %url, "Sending Kea command");

        let mut builder = client.post(url.clone()).timeout(deadline).json(request);
        if let Some(auth) = config
            .basic_auth
            .as_ref()
            .filter(|_| !config.tls.has_client_identity())
        {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }

        let response = builder.send().await.map_err(|e| {
            let err = classify_reqwest_error(&url, deadline, &e);
            metrics::record_kea_command(&request.command, "transport_error", start.elapsed());
            err
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            metrics::record_kea_command(&request.command, "transport_error", start.elapsed());
            classify_reqwest_error(&url, deadline, &e)
        })?;

        match decode_response(&body) {
            Ok(decoded) => {
                debug!(
                    command = %request.command,
                    result = decoded.result,
                    text = %decoded.text,
                    elapsed = ?start.elapsed(),
                    "Kea command completed"
                );
                metrics::record_kea_command(&request.command, &decoded.result.to_string(), start.elapsed());
                Ok(decoded)
            }
            Err(failure) => {
                warn!(
                    command = %request.command,
                    status = %status,
                    payload = %failure.pretty_payload(),
                    "Unrecognized Kea response format"
                );
                metrics::record_kea_command(&request.command, "malformed", start.elapsed());
                Err(KeaError::MalformedResponse {
                    status: status.as_u16(),
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
