// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TLS material for the Kea Control Agent connection.
//!
//! Material comes either from files (CA bundle, client certificate and key)
//! or from memory (typically a Kubernetes Secret). In-memory PEM takes
//! precedence over paths.

use crate::constants::{
    CLIENT_CERT_FALLBACK_PAIRS, SECRET_KEY_CA, SECRET_KEY_CERT, SECRET_KEY_KEY,
    SERVICE_ACCOUNT_NAMESPACE_FILE,
};
use crate::kea_errors::KeaError;
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// TLS settings for the control-agent client.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TlsSettings {
    pub ca_cert_path: Option<PathBuf>,
    pub client_cert_path: Option<PathBuf>,
    pub client_key_path: Option<PathBuf>,
    pub ca_pem: Option<Vec<u8>>,
    pub client_cert_pem: Option<Vec<u8>>,
    pub client_key_pem: Option<Vec<u8>>,
    /// Skip server certificate verification. Explicit opt-in only.
    pub insecure_skip_verify: bool,
    /// Name expected in the server certificate, when it differs from the endpoint host.
    pub server_name: Option<String>,
}

impl std::fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsSettings")
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_cert_path", &self.client_cert_path)
            .field("client_key_path", &self.client_key_path)
            .field("ca_pem", &self.ca_pem.as_ref().map(|_| "<in-memory>"))
            .field(
                "client_cert_pem",
                &self.client_cert_pem.as_ref().map(|_| "<in-memory>"),
            )
            .field(
                "client_key_pem",
                &self.client_key_pem.as_ref().map(|_| "<redacted>"),
            )
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("server_name", &self.server_name)
            .finish()
    }
}

impl TlsSettings {
    /// True when any CA or client certificate is configured, in memory or on disk.
    #[must_use]
    pub fn has_tls_material(&self) -> bool {
        self.ca_pem.is_some()
            || self.client_cert_pem.is_some()
            || self.ca_cert_path.is_some()
            || self.client_cert_path.is_some()
    }

    /// True when a client certificate is configured.
    #[must_use]
    pub fn has_client_identity(&self) -> bool {
        self.client_cert_pem.is_some() || self.client_cert_path.is_some()
    }

    /// Load the CA bundle, preferring in-memory PEM.
    ///
    /// # Errors
    ///
    /// Returns `KeaError::TlsConfig` if the CA file cannot be read.
    pub fn load_ca(&self) -> Result<Option<Vec<u8>>, KeaError> {
        if let Some(pem) = &self.ca_pem {
            return Ok(Some(pem.clone()));
        }
        match &self.ca_cert_path {
            Some(path) => std::fs::read(path).map(Some).map_err(|e| KeaError::TlsConfig {
                reason: format!("failed to read CA file {}: {e}", path.display()),
            }),
            None => Ok(None),
        }
    }

    /// Load the client identity as one PEM buffer (certificate chain then key).
    ///
    /// In-memory PEM wins. File paths go through [`load_identity_with_fallback`].
    ///
    /// # Errors
    ///
    /// Returns `KeaError::TlsConfig` if a certificate is configured but no
    /// usable certificate/key pair can be loaded.
    pub fn load_identity(&self) -> Result<Option<Vec<u8>>, KeaError> {
        if let Some(cert) = &self.client_cert_pem {
            let key = self.client_key_pem.as_ref().ok_or_else(|| KeaError::TlsConfig {
                reason: "client certificate given without a private key".to_string(),
            })?;
            let pem = join_identity(cert, key);
            validate_identity(&pem)?;
            return Ok(Some(pem));
        }

        match &self.client_cert_path {
            Some(cert_path) => {
                let key_path = self
                    .client_key_path
                    .clone()
                    .unwrap_or_else(|| cert_path.with_extension("key"));
                load_identity_with_fallback(cert_path, &key_path).map(Some)
            }
            None => Ok(None),
        }
    }
}

fn join_identity(cert: &[u8], key: &[u8]) -> Vec<u8> {
    let mut pem = Vec::with_capacity(cert.len() + key.len() + 1);
    pem.extend_from_slice(cert);
    if !cert.ends_with(b"\n") {
        pem.push(b'\n');
    }
    pem.extend_from_slice(key);
    pem
}

fn validate_identity(pem: &[u8]) -> Result<(), KeaError> {
    reqwest::Identity::from_pem(pem)
        .map(|_| ())
        .map_err(|e| KeaError::TlsConfig {
            reason: format!("invalid client certificate/key: {e}"),
        })
}

fn try_pair(cert_path: &Path, key_path: &Path) -> Result<Vec<u8>, KeaError> {
    let read = |path: &Path| {
        std::fs::read(path).map_err(|e| KeaError::TlsConfig {
            reason: format!("failed to read {}: {e}", path.display()),
        })
    };
    let pem = join_identity(&read(cert_path)?, &read(key_path)?);
    validate_identity(&pem)?;
    Ok(pem)
}

/// Load a client certificate/key pair, falling back to conventional file names.
///
/// When the configured pair cannot be loaded, `client.crt`/`client.key` and
/// then `tls.crt`/`tls.key` in the certificate's directory are tried.
///
/// # Errors
///
/// Returns the error of the configured pair if no candidate loads.
pub fn load_identity_with_fallback(cert_path: &Path, key_path: &Path) -> Result<Vec<u8>, KeaError> {
    let primary_err = match try_pair(cert_path, key_path) {
        Ok(pem) => return Ok(pem),
        Err(e) => e,
    };

    let dir = cert_path.parent().unwrap_or_else(|| Path::new("."));
    for (cert_name, key_name) in CLIENT_CERT_FALLBACK_PAIRS {
        let (cert, key) = (dir.join(cert_name), dir.join(key_name));
        if cert == cert_path && key == key_path {
            continue;
        }
        match try_pair(&cert, &key) {
            Ok(pem) => {
                info!(
                    cert = %cert.display(),
                    key = %key.display(),
                    "Loaded client certificate from fallback location"
                );
                return Ok(pem);
            }
            Err(e) => debug!(cert = %cert.display(), error = %e, "Fallback client certificate not usable"),
        }
    }

    warn!(cert = %cert_path.display(), error = %primary_err, "No usable client certificate found");
    Err(primary_err)
}

/// Read TLS material from a Kubernetes Secret (`ca.crt`, `tls.crt`, `tls.key`).
///
/// Keys that are absent are left unset.
///
/// # Errors
///
/// Returns an error if the Secret cannot be fetched.
pub async fn tls_material_from_secret(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<TlsSettings> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get(name)
        .await
        .with_context(|| format!("failed to read TLS secret {namespace}/{name}"))?;

    let data = secret.data.unwrap_or_default();
    let field = |key: &str| data.get(key).map(|bytes| bytes.0.clone());

    let settings = TlsSettings {
        ca_pem: field(SECRET_KEY_CA),
        client_cert_pem: field(SECRET_KEY_CERT),
        client_key_pem: field(SECRET_KEY_KEY),
        ..TlsSettings::default()
    };

    info!(
        secret = %format!("{namespace}/{name}"),
        has_ca = settings.ca_pem.is_some(),
        has_client_cert = settings.client_cert_pem.is_some(),
        "Loaded Kea TLS material from secret"
    );

    Ok(settings)
}

/// Namespace the operator pod runs in, read from the service-account mount.
pub async fn pod_namespace() -> Option<String> {
    tokio::fs::read_to_string(SERVICE_ACCOUNT_NAMESPACE_FILE)
        .await
        .ok()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
}

#[cfg(test)]
#[path = "tls_tests.rs"]
mod tls_tests;
