//! Reconciliation of LoadBalancer Services.
//!
//! The engine proper lives in the submodules and knows nothing about
//! Kubernetes:
//! - `poller`: convergence polling and cancellation
//! - `locator`: stored id to remote load balancer
//! - `forwarding_rules`, `health_check`, `backend_nodes`: diff engines
//! - `lifecycle`: create / converge / delete orchestration
//!
//! [`Reconciler`] feeds it from Services and Nodes and writes the results
//! back (finalizer, ingress status).

pub mod backend_nodes;
pub mod forwarding_rules;
pub mod health_check;
pub mod lifecycle;
pub mod locator;
pub mod poller;

#[cfg(test)]
mod health_check_test;

use crate::backoff::FibonacciBackoff;
use crate::binder::ObjectKey;
use crate::cluster::ClusterInfo;
use crate::desired::{load_balancer_id, DesiredSpec};
use crate::error::ControllerError;
use crate::provider_id::backend_targets;
use crate::reconcile_helpers::*;
use k8s_openapi::api::core::v1::{Node, Service};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use kube_runtime::controller::Action;
use lifecycle::{DeleteOutcome, LoadBalancerStatus, LoadBalancers};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Requeue delay for conditions that clear up on their own
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Backoff state for a Service
#[derive(Debug, Clone, Default)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn increment_error(&mut self) {
        self.error_count += 1;
    }

    fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Per-Service bookkeeping: error backoff and the lock serializing work on it.
///
/// Entries are created on first use and dropped by [`ServiceStates::forget`]
/// once a Service no longer owns a load balancer.
#[derive(Debug, Default)]
struct ServiceStates {
    /// namespace/name -> BackoffState
    backoff: Mutex<HashMap<String, BackoffState>>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ServiceStates {
    async fn lock(&self, key: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn next_backoff(&self, key: &str) -> (Duration, u32) {
        match self.backoff.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_default();
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using default backoff", e);
                (RETRY_DELAY, 0)
            }
        }
    }

    fn increment_error(&self, key: &str) {
        if let Ok(mut states) = self.backoff.lock() {
            states.entry(key.to_string()).or_default().increment_error();
        }
    }

    fn reset_error(&self, key: &str) {
        if let Ok(mut states) = self.backoff.lock() {
            if let Some(state) = states.get_mut(key) {
                state.reset();
            }
        }
    }

    /// Drop everything kept for `key`
    fn forget(&self, key: &str) {
        if let Ok(mut states) = self.backoff.lock() {
            states.remove(key);
        }
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> (usize, usize) {
        let backoff = self.backoff.lock().map(|states| states.len()).unwrap_or_default();
        let locks = self.locks.lock().map(|locks| locks.len()).unwrap_or_default();
        (backoff, locks)
    }
}

/// Reconciles LoadBalancer Services against Advanced Hosting.
pub struct Reconciler {
    client: Client,
    engine: LoadBalancers,
    cluster: ClusterInfo,
    /// Parent of every per-reconciliation token; fired on shutdown
    shutdown: CancellationToken,
    resync: Duration,
    /// Serializes work on one Service between the controller and host syncs,
    /// and tracks its errors
    states: ServiceStates,
}

/// Requeue for engine conditions that clear up without intervention
pub fn transient_requeue(error: &ControllerError) -> Option<Action> {
    match error {
        ControllerError::Reconcile(e) if e.is_retryable() => Some(Action::requeue(RETRY_DELAY)),
        _ => None,
    }
}

impl Reconciler {
    pub fn new(
        client: Client,
        engine: LoadBalancers,
        cluster: ClusterInfo,
        shutdown: CancellationToken,
        resync: Duration,
    ) -> Self {
        Self {
            client,
            engine,
            cluster,
            shutdown,
            resync,
            states: ServiceStates::default(),
        }
    }

    /// Reconcile one Service.
    ///
    /// Retryable engine conditions become a short requeue; everything else
    /// is returned for the error policy to back off on.
    pub async fn reconcile(&self, service: &Service) -> Result<Action, ControllerError> {
        let key = service_key(service)?;
        let _guard = self.lock(&key).await;

        match self.reconcile_service(service, &key).await {
            Ok(action) => {
                self.reset_error(&key.to_string());
                Ok(action)
            }
            Err(e) => match transient_requeue(&e) {
                Some(action) => {
                    info!("Service {}: {}, checking again in {:?}", key, e, RETRY_DELAY);
                    Ok(action)
                }
                None => {
                    self.increment_error(&key.to_string());
                    Err(e)
                }
            },
        }
    }

    async fn reconcile_service(&self, service: &Service, key: &ObjectKey) -> Result<Action, ControllerError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);

        if needs_cleanup(service) {
            return self.cleanup(&api, service, key).await;
        }
        if !wants_load_balancer(service) || is_being_deleted(service) {
            debug!("Service {} does not need a load balancer", key);
            return Ok(Action::await_change());
        }

        if !has_finalizer(service) {
            api.patch(&key.name, &PatchParams::default(), &Patch::Merge(&add_finalizer_patch(service)))
                .await?;
            info!("Added finalizer to Service {}", key);
        }

        let desired = DesiredSpec::from_service(service, self.backend_targets().await?, &self.cluster)?;
        let cancel = self.shutdown.child_token();
        let status = self
            .engine
            .ensure_present(&cancel, key, &load_balancer_id(service), &desired)
            .await?;
        info!("Load balancer of Service {} is in sync", key);

        self.publish_status(&api, service, key, &status).await?;
        Ok(Action::requeue(self.resync))
    }

    /// Delete the load balancer, then release the Service
    async fn cleanup(&self, api: &Api<Service>, service: &Service, key: &ObjectKey) -> Result<Action, ControllerError> {
        let cancel = self.shutdown.child_token();
        match self.engine.ensure_absent(&cancel, &load_balancer_id(service)).await? {
            DeleteOutcome::InProgress => {
                info!("Load balancer of Service {} is being deleted", key);
                return Ok(Action::requeue(RETRY_DELAY));
            }
            DeleteOutcome::Deleted => {}
        }

        if !is_being_deleted(service) {
            self.publish_status(api, service, key, &LoadBalancerStatus::default()).await?;
        }
        api.patch(&key.name, &PatchParams::default(), &Patch::Merge(&remove_finalizer_patch(service)))
            .await?;
        self.states.forget(&key.to_string());
        info!("Load balancer of Service {} deleted, finalizer removed", key);
        Ok(Action::await_change())
    }

    async fn publish_status(
        &self,
        api: &Api<Service>,
        service: &Service,
        key: &ObjectKey,
        status: &LoadBalancerStatus,
    ) -> Result<(), ControllerError> {
        if !ingress_needs_update(service, status) {
            return Ok(());
        }
        api.patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&ingress_status_patch(status)))
            .await?;
        info!("Service {} ingress set to [{}]", key, status.ingress.join(", "));
        Ok(())
    }

    async fn backend_targets(&self) -> Result<Vec<String>, ControllerError> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let nodes = nodes.list(&ListParams::default()).await?;
        Ok(backend_targets(&nodes.items)?)
    }

    /// Point every provisioned load balancer at the current nodes.
    ///
    /// Services without a stored id are left to the controller.
    pub async fn sync_hosts(&self, services: &[Arc<Service>]) -> Result<(), ControllerError> {
        let targets = self.backend_targets().await?;
        info!("Syncing {} backend nodes to load balancers", targets.len());

        for service in services {
            let lb_id = load_balancer_id(service);
            if lb_id.is_empty() || !wants_load_balancer(service) || is_being_deleted(service) {
                continue;
            }
            let key = service_key(service)?;
            let desired = match DesiredSpec::from_service(service, targets.clone(), &self.cluster) {
                Ok(desired) => desired,
                Err(e) => {
                    warn!("Skipping host sync of Service {}: {}", key, e);
                    continue;
                }
            };

            let _guard = self.lock(&key).await;
            let cancel = self.shutdown.child_token();
            match self.engine.update_hosts(&cancel, &lb_id, &desired).await {
                Ok(()) => debug!("Hosts of Service {} updated", key),
                Err(e) if e.is_not_found() => {
                    warn!("Load balancer {} of Service {} is gone; it will be recreated", lb_id, key)
                }
                Err(e) => error!("Failed to update hosts of Service {}: {}", key, e),
            }
        }
        Ok(())
    }

    /// Publish the ingress of load balancers that already exist.
    ///
    /// Called once at startup so Services show their addresses before the
    /// first full reconciliation finishes.
    pub async fn startup_reconciliation(&self, services: &Api<Service>) -> Result<(), ControllerError> {
        let services = services.list(&ListParams::default()).await?;
        let cancel = self.shutdown.child_token();
        let mut published = 0;

        for service in services.items.iter().filter(|s| wants_load_balancer(s)) {
            let lb_id = load_balancer_id(service);
            if lb_id.is_empty() {
                continue;
            }
            let key = service_key(service)?;
            let api: Api<Service> = Api::namespaced(self.client.clone(), &key.namespace);

            match self.engine.get_status(&cancel, &lb_id).await {
                Ok(Some(status)) => {
                    self.publish_status(&api, service, &key, &status).await?;
                    published += 1;
                }
                Ok(None) => warn!("Load balancer {} of Service {} no longer exists", lb_id, key),
                Err(e) => warn!("Failed to look up load balancer {} of Service {}: {}", lb_id, key, e),
            }
        }

        info!("Startup reconciliation complete: {} load balancers found", published);
        Ok(())
    }

    async fn lock(&self, key: &ObjectKey) -> tokio::sync::OwnedMutexGuard<()> {
        self.states.lock(&key.to_string()).await
    }

    /// Next backoff delay for a Service, with its current error count
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (Duration, u32) {
        self.states.next_backoff(resource_key)
    }

    pub fn increment_error(&self, resource_key: &str) {
        self.states.increment_error(resource_key);
    }

    /// Reset error count for a Service (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        self.states.reset_error(resource_key);
    }
}
