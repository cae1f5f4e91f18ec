//! Kubernetes resource watchers.
//!
//! Services drive a `kube_runtime::Controller`; Nodes are watched on the side
//! and push backend changes to every provisioned load balancer.

use crate::error::ControllerError;
use crate::provider_id::is_backend_candidate;
use crate::reconcile_helpers::service_key;
use crate::reconciler::Reconciler;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::Api;
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::Store;
use kube_runtime::watcher::{self, Event};
use kube_runtime::{Controller, WatchStreamExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Backend candidates of the cluster, by node name, with their provider ID
#[derive(Debug, Default)]
pub struct NodeSet {
    members: BTreeMap<String, String>,
    /// Members collected during a (re)list, swapped in on `InitDone`
    staging: Option<BTreeMap<String, String>>,
}

impl NodeSet {
    /// Apply a watch event; true when the set of backends changed.
    pub fn apply(&mut self, event: Event<Node>) -> bool {
        match event {
            Event::Init => {
                self.staging = Some(BTreeMap::new());
                false
            }
            Event::InitApply(node) => {
                if let (Some(staging), Some((name, provider_id))) = (self.staging.as_mut(), member(&node)) {
                    staging.insert(name, provider_id);
                }
                false
            }
            Event::InitDone => {
                let listed = self.staging.take().unwrap_or_default();
                let changed = listed != self.members;
                self.members = listed;
                changed
            }
            Event::Apply(node) => match member(&node) {
                Some((name, provider_id)) => {
                    self.members.insert(name, provider_id.clone()).as_ref() != Some(&provider_id)
                }
                None => node
                    .metadata
                    .name
                    .as_ref()
                    .is_some_and(|name| self.members.remove(name).is_some()),
            },
            Event::Delete(node) => node
                .metadata
                .name
                .as_ref()
                .is_some_and(|name| self.members.remove(name).is_some()),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}

/// Name and provider ID of `node` when it is a backend candidate
fn member(node: &Node) -> Option<(String, String)> {
    if !is_backend_candidate(node) {
        return None;
    }
    let name = node.metadata.name.clone()?;
    let provider_id = node
        .spec
        .as_ref()
        .and_then(|spec| spec.provider_id.clone())
        .unwrap_or_default();
    Some((name, provider_id))
}

/// Watches Services and Nodes.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    services: Api<Service>,
    nodes: Api<Node>,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, services: Api<Service>, nodes: Api<Node>) -> Self {
        Self {
            reconciler,
            services,
            nodes,
        }
    }

    /// Run the Service controller until a shutdown signal arrives.
    pub async fn run(&self) -> Result<(), ControllerError> {
        info!("Starting Service watcher");

        let reconcile = |service: Arc<Service>, reconciler: Arc<Reconciler>| async move {
            debug!(
                "Reconciling Service {}/{}",
                service.metadata.namespace.as_deref().unwrap_or("default"),
                service.metadata.name.as_deref().unwrap_or_default()
            );
            reconciler.reconcile(&service).await
        };

        let error_policy = |service: Arc<Service>, error: &ControllerError, reconciler: Arc<Reconciler>| {
            let key = service_key(&service).map(|key| key.to_string()).unwrap_or_default();
            let (delay, error_count) = reconciler.get_backoff_for_resource(&key);
            error!(
                "Reconciliation of Service {} failed ({} consecutive errors), retrying in {:?}: {}",
                key, error_count, delay, error
            );
            Action::requeue(delay)
        };

        // Debounce batches bursts of Service updates; concurrency bounds
        // the number of load balancers converging at once.
        let controller = Controller::new(self.services.clone(), watcher::Config::default())
            .with_config(ControllerConfig::default().debounce(Duration::from_secs(5)).concurrency(3))
            .shutdown_on_signal();

        let node_watch = tokio::spawn(watch_nodes(
            self.nodes.clone(),
            self.reconciler.clone(),
            controller.store(),
        ));

        controller
            .run(reconcile, error_policy, self.reconciler.clone())
            .for_each(|res| async move {
                match res {
                    Ok((service, _)) => debug!("Reconciled Service {}", service),
                    Err(e) => warn!("Service controller error: {}", e),
                }
            })
            .await;

        node_watch.abort();
        info!("Service watcher stopped");
        Ok(())
    }
}

/// Push node changes to every provisioned load balancer
async fn watch_nodes(api: Api<Node>, reconciler: Arc<Reconciler>, services: Store<Service>) {
    if services.wait_until_ready().await.is_err() {
        warn!("Service cache closed before it was ready; not watching nodes");
        return;
    }
    info!("Starting Node watcher");

    let mut nodes = NodeSet::default();
    let mut events = watcher::watcher(api, watcher::Config::default()).default_backoff().boxed();

    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if !nodes.apply(event) {
                    continue;
                }
                info!("Backend nodes changed ({} candidates)", nodes.len());
                if let Err(e) = reconciler.sync_hosts(&services.state()).await {
                    error!("Failed to sync backend nodes: {}", e);
                }
            }
            Err(e) => warn!("Node watch error: {}", e),
        }
    }
}
