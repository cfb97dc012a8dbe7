// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use kea_operator::{
    config::OperatorConfig,
    constants::{
        ERROR_REQUEUE_DURATION_SECS, KIND_NETWORK_CONFIGURATION, STARTUP_PROBE_ATTEMPTS,
        STARTUP_PROBE_BACKOFF, STARTUP_PROBE_TIMEOUT, TOKIO_WORKER_THREADS,
    },
    context::Context,
    crd::NetworkConfiguration,
    kea::{tls, DhcpService, KeaClient},
    metrics,
    reconcilers::{reconcile_network_configuration, KubeStore},
    startup::{check_kea_connectivity, verify_crds},
};
use kube::{
    runtime::{controller::Action, watcher::Config, Controller},
    Api, Client, ResourceExt,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
struct ReconcileError(#[from] anyhow::Error);

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("kea-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Format: timestamp file:line LEVEL message
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json switches to JSON output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let config = OperatorConfig::parse();
    info!("Starting Kea DHCP operator");

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;

    let secret_tls = match &config.kea_tls_secret_name {
        Some(name) => {
            let namespace = match &config.kea_tls_secret_namespace {
                Some(ns) => ns.clone(),
                None => tls::pod_namespace().await.unwrap_or_else(|| "default".to_string()),
            };
            Some(tls::tls_material_from_secret(&client, &namespace, name).await?)
        }
        None => None,
    };

    let kea_client = KeaClient::new(config.client_config(secret_tls)?)?;
    if let Some(secondary) = &config.kea_secondary_url {
        warn!(secondary = %secondary, "Secondary Kea endpoint configured; failover is not handled by the operator");
    }
    let dhcp = Arc::new(DhcpService::new(
        Arc::new(kea_client),
        config.kea_service.clone(),
    ));

    check_kea_connectivity(
        &dhcp,
        STARTUP_PROBE_ATTEMPTS,
        STARTUP_PROBE_TIMEOUT,
        STARTUP_PROBE_BACKOFF,
    )
    .await?;
    verify_crds(&client).await?;

    let ctx = Arc::new(Context::new(
        Arc::new(KubeStore::new(client.clone())),
        dhcp,
        config.reconcile_interval(),
        config.reservation_policy,
    ));

    tokio::select! {
        result = run_networkconfiguration_controller(client, ctx) => {
            error!("CRITICAL: NetworkConfiguration controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("NetworkConfiguration controller exited unexpectedly without error")
        }
        result = metrics::serve(config.metrics_addr) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Run the `NetworkConfiguration` controller
async fn run_networkconfiguration_controller(client: Client, ctx: Arc<Context>) -> Result<()> {
    info!("Starting NetworkConfiguration controller");

    let api = Api::<NetworkConfiguration>::all(client);

    Controller::new(api, Config::default())
        .run(reconcile_networkconfiguration_wrapper, error_policy, ctx)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Reconcile wrapper for `NetworkConfiguration`
async fn reconcile_networkconfiguration_wrapper(
    nc: Arc<NetworkConfiguration>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    debug!(
        name = %nc.name_any(),
        namespace = ?nc.namespace(),
        "Reconcile wrapper called for NetworkConfiguration"
    );

    match reconcile_network_configuration(&ctx, &nc).await {
        Ok(action) => {
            debug!("Reconciled NetworkConfiguration {}: {:?}", nc.name_any(), action);
            metrics::record_reconciliation_success(KIND_NETWORK_CONFIGURATION, start.elapsed());
            Ok(action.into())
        }
        Err(e) => {
            error!("Failed to reconcile NetworkConfiguration {}: {}", nc.name_any(), e);
            metrics::record_reconciliation_error(KIND_NETWORK_CONFIGURATION, start.elapsed());
            Err(e.into())
        }
    }
}

/// Error policy for controller
fn error_policy(
    _resource: Arc<NetworkConfiguration>,
    _err: &ReconcileError,
    _ctx: Arc<Context>,
) -> Action {
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}
