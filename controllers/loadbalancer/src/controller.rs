//! Main controller implementation.
//!
//! Wires the Advanced Hosting client, the Kubernetes client, the engine and
//! the watchers together, then runs until shutdown.

use crate::binder::ServiceAnnotationBinder;
use crate::cluster::ClusterInfo;
use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::lifecycle::LoadBalancers;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use ah_client::{AhClient, LoadBalancersApi};
use k8s_openapi::api::core::v1::{Node, Service};
use kube::{Api, Client};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Load balancer controller process
pub struct Controller {
    service_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Connect to both APIs, resolve cluster placement and start watching.
    pub async fn new(config: Config, shutdown: CancellationToken) -> Result<Self, ControllerError> {
        info!("Initializing load balancer controller");

        let kube_client = Client::try_default().await?;

        let ah_client: Arc<dyn LoadBalancersApi> =
            Arc::new(AhClient::new(config.api_url.clone(), config.api_token.clone())?);

        // Placement lookups double as a token and connectivity check
        let cluster = ClusterInfo::resolve(
            ah_client.as_ref(),
            &config.datacenter,
            &config.private_network_number,
        )
        .await
        .map_err(|e| {
            error!("Failed to resolve cluster placement: {}", e);
            error!("Please ensure:");
            error!("  1. AH_API_TOKEN is set to a valid token");
            error!("  2. AH_CLUSTER_DATACENTER and AH_CLUSTER_PRIVATE_NETWORK_NUMBER name existing objects");
            error!("  3. The API is reachable at {}", config.api_url);
            e
        })?;

        let services: Api<Service> = match config.namespace.as_deref() {
            Some(ns) => Api::namespaced(kube_client.clone(), ns),
            None => Api::all(kube_client.clone()),
        };
        let nodes: Api<Node> = Api::all(kube_client.clone());

        let engine = LoadBalancers::new(
            ah_client,
            Arc::new(ServiceAnnotationBinder::new(kube_client.clone())),
            config.poll,
        );
        let reconciler = Arc::new(Reconciler::new(kube_client, engine, cluster, shutdown, config.resync));

        info!("Performing startup reconciliation of existing load balancers...");
        if let Err(e) = reconciler.startup_reconciliation(&services).await {
            warn!("Startup reconciliation failed (will continue): {}", e);
        }

        let watcher = Watcher::new(reconciler, services, nodes);
        let service_watcher = tokio::spawn(async move { watcher.run().await });

        Ok(Self { service_watcher })
    }

    /// Wait for the watchers to stop.
    pub async fn run(self) -> Result<(), ControllerError> {
        self.service_watcher
            .await
            .map_err(|e| ControllerError::Watch(format!("Service watcher panicked: {}", e)))?
            .map_err(|e| ControllerError::Watch(format!("Service watcher error: {}", e)))
    }
}
