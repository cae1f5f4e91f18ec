//! Load balancer lifecycle: create, converge, delete.
//!
//! [`LoadBalancers`] is the entry point of the engine. It holds no state of
//! its own between calls; the remote platform and the stored id are the only
//! sources of truth.

use super::poller::{PollConfig, SyncContext};
use super::{backend_nodes, forwarding_rules, health_check, locator};
use crate::binder::{IdentityBinder, ObjectKey};
use crate::desired::DesiredSpec;
use crate::error::ReconcileError;
use ah_client::{states, LoadBalancer, LoadBalancerUpdateRequest, LoadBalancersApi};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Addresses a load balancer answers on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBalancerStatus {
    pub ingress: Vec<String>,
}

impl LoadBalancerStatus {
    fn of(lb: &LoadBalancer) -> Self {
        Self { ingress: lb.addresses() }
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Nothing is left remotely
    Deleted,
    /// Delete was accepted; check again later
    InProgress,
}

/// Reconciliation engine for Advanced Hosting load balancers
pub struct LoadBalancers {
    api: Arc<dyn LoadBalancersApi>,
    binder: Arc<dyn IdentityBinder>,
    poll: PollConfig,
}

impl LoadBalancers {
    pub fn new(api: Arc<dyn LoadBalancersApi>, binder: Arc<dyn IdentityBinder>, poll: PollConfig) -> Self {
        Self { api, binder, poll }
    }

    pub fn poll_config(&self) -> &PollConfig {
        &self.poll
    }

    fn context<'a>(&'a self, cancel: &'a CancellationToken) -> SyncContext<'a> {
        SyncContext::new(self.api.as_ref(), &self.poll, cancel)
    }

    /// Current addresses of the load balancer stored as `lb_id`, if it exists.
    pub async fn get_status(
        &self,
        cancel: &CancellationToken,
        lb_id: &str,
    ) -> Result<Option<LoadBalancerStatus>, ReconcileError> {
        let ctx = self.context(cancel);
        Ok(locator::locate(&ctx, lb_id).await?.as_ref().map(LoadBalancerStatus::of))
    }

    /// Create or converge the load balancer of `object`.
    ///
    /// A freshly created load balancer is never active, so the first call for
    /// an object ends in [`ReconcileError::NotActive`] once the id is bound.
    pub async fn ensure_present(
        &self,
        cancel: &CancellationToken,
        object: &ObjectKey,
        lb_id: &str,
        desired: &DesiredSpec,
    ) -> Result<LoadBalancerStatus, ReconcileError> {
        let ctx = self.context(cancel);

        let lb = match locator::locate(&ctx, lb_id).await? {
            Some(lb) => lb,
            None => self.adopt_or_create(&ctx, object, desired).await?,
        };
        ensure_active(&lb)?;

        self.converge(&ctx, &lb, desired).await?;
        Ok(LoadBalancerStatus::of(&lb))
    }

    /// Converge an existing load balancer; never creates one.
    pub async fn update_hosts(
        &self,
        cancel: &CancellationToken,
        lb_id: &str,
        desired: &DesiredSpec,
    ) -> Result<(), ReconcileError> {
        let ctx = self.context(cancel);

        let Some(lb) = locator::locate(&ctx, lb_id).await? else {
            return Err(ReconcileError::NotFound(lb_id.to_string()));
        };
        ensure_active(&lb)?;

        self.converge(&ctx, &lb, desired).await
    }

    /// Start deleting the load balancer stored as `lb_id`.
    ///
    /// Does not wait for the deletion to finish.
    pub async fn ensure_absent(&self, cancel: &CancellationToken, lb_id: &str) -> Result<DeleteOutcome, ReconcileError> {
        let ctx = self.context(cancel);

        let Some(lb) = locator::locate(&ctx, lb_id).await? else {
            return Ok(DeleteOutcome::Deleted);
        };
        if lb.state == states::DELETING {
            return Err(ReconcileError::AlreadyDeleting);
        }

        match ctx.call(ctx.api.delete_load_balancer(&lb.id)).await {
            Ok(()) => {
                info!("Deleting load balancer {} ({})", lb.id, lb.name);
                Ok(DeleteOutcome::InProgress)
            }
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::Deleted),
            Err(e) => Err(e),
        }
    }

    /// Load balancer named like `desired` left behind by an unbound creation, or a new one.
    ///
    /// Only uid-derived names are looked up; a user-chosen name may belong to
    /// another object.
    async fn adopt_or_create(
        &self,
        ctx: &SyncContext<'_>,
        object: &ObjectKey,
        desired: &DesiredSpec,
    ) -> Result<LoadBalancer, ReconcileError> {
        let orphan = if desired.adoptable {
            locator::locate_by_name(ctx, &desired.name).await?
        } else {
            None
        };
        if let Some(lb) = orphan {
            warn!(
                "Adopting load balancer {} named {} for {}; its id was never recorded",
                lb.id, lb.name, object
            );
            self.bind(object, &lb.id).await?;
            return Ok(lb);
        }

        let lb = ctx.call(ctx.api.create_load_balancer(&desired.create_request())).await?;
        info!("Created load balancer {} ({}) for {}", lb.id, lb.name, object);
        self.bind(object, &lb.id).await?;
        Ok(lb)
    }

    async fn bind(&self, object: &ObjectKey, lb_id: &str) -> Result<(), ReconcileError> {
        self.binder
            .bind(object, lb_id)
            .await
            .map_err(|e| ReconcileError::Binding {
                id: lb_id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Apply info, rules, health check and backends in that order.
    async fn converge(&self, ctx: &SyncContext<'_>, lb: &LoadBalancer, desired: &DesiredSpec) -> Result<(), ReconcileError> {
        sync_info(ctx, lb, desired).await?;
        forwarding_rules::sync(ctx, lb, &desired.listeners).await?;
        match &desired.health_check {
            Some(policy) => health_check::sync(ctx, lb, policy).await?,
            None => health_check::remove(ctx, lb).await?,
        }
        backend_nodes::sync(ctx, lb, &desired.targets).await?;
        debug!("Load balancer {} converged", lb.id);
        Ok(())
    }
}

fn ensure_active(lb: &LoadBalancer) -> Result<(), ReconcileError> {
    if lb.state == states::ACTIVE {
        Ok(())
    } else {
        Err(ReconcileError::NotActive { state: lb.state.clone() })
    }
}

/// Update name and balancing algorithm when they differ
async fn sync_info(ctx: &SyncContext<'_>, lb: &LoadBalancer, desired: &DesiredSpec) -> Result<(), ReconcileError> {
    let request = LoadBalancerUpdateRequest {
        name: (lb.name != desired.name).then(|| desired.name.clone()),
        balancing_algorithm: (lb.balancing_algorithm != desired.balancing_algorithm)
            .then(|| desired.balancing_algorithm.clone()),
    };
    if request == LoadBalancerUpdateRequest::default() {
        return Ok(());
    }

    ctx.call(ctx.api.update_load_balancer(&lb.id, &request)).await?;
    info!("Updated load balancer {} info: {:?}", lb.id, request);

    let api = ctx.api;
    let lb_id = lb.id.as_str();
    ctx.wait_for(
        &format!("load balancer {}", lb_id),
        states::ACTIVE,
        move || async move { api.get_load_balancer(lb_id).await.map(|lb| lb.state) },
    )
    .await
}
