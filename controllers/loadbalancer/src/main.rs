//! Advanced Hosting Load Balancer Controller
//!
//! Provisions an Advanced Hosting managed load balancer for every Kubernetes
//! Service of type LoadBalancer and keeps its listeners, health check and
//! backend nodes in sync with the Service and the cluster's nodes.

mod backoff;
mod binder;
mod cluster;
mod config;
mod controller;
mod desired;
mod error;
mod provider_id;
mod reconcile_helpers;
mod reconciler;
mod watcher;

#[cfg(test)]
mod desired_test;
#[cfg(test)]
mod reconcile_helpers_test;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // kube and reqwest both use rustls; pin the provider before either connects
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting Advanced Hosting load balancer controller");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  API URL: {}", config.api_url);
    info!("  Datacenter: {}", config.datacenter);
    info!("  Private network: {}", config.private_network_number);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Poll: every {:?}, timeout {:?}", config.poll.interval, config.poll.timeout);
    info!("  Resync: {:?}", config.resync);

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let controller = Controller::new(config, shutdown).await?;
    controller.run().await?;

    info!("Controller stopped");
    Ok(())
}

/// Abort in-flight convergence polls on SIGINT or SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received, cancelling in-flight reconciliations");
    shutdown.cancel();
}
