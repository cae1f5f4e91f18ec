//! Health check convergence. A load balancer carries at most one check.

use super::poller::SyncContext;
use crate::desired::health_check_matches;
use crate::error::ReconcileError;
use ah_client::{states, HealthCheckRequest, LoadBalancer};
use tracing::{debug, info};

/// Make the health check of `lb` carry `policy`.
pub async fn sync(ctx: &SyncContext<'_>, lb: &LoadBalancer, policy: &HealthCheckRequest) -> Result<(), ReconcileError> {
    let check_id = match lb.health_checks.first() {
        None => {
            let check = ctx.call(ctx.api.create_health_check(&lb.id, policy)).await?;
            info!("Created health check {} on load balancer {}", check.id, lb.id);
            check.id
        }
        Some(check) if health_check_matches(check, policy) => {
            debug!("Health check {} is up to date", check.id);
            return Ok(());
        }
        Some(check) => {
            ctx.call(ctx.api.update_health_check(&lb.id, &check.id, policy))
                .await?;
            info!("Updated health check {} on load balancer {}", check.id, lb.id);
            check.id.clone()
        }
    };

    let api = ctx.api;
    let (lb_id, check_id) = (lb.id.as_str(), check_id.as_str());
    ctx.wait_for(
        &format!("health check {} of load balancer {}", check_id, lb_id),
        states::ACTIVE,
        move || async move { api.get_health_check(lb_id, check_id).await.map(|hc| hc.state) },
    )
    .await
}

/// Delete the health check of `lb`, if it has one.
pub async fn remove(ctx: &SyncContext<'_>, lb: &LoadBalancer) -> Result<(), ReconcileError> {
    let Some(check) = lb.health_checks.first() else {
        return Ok(());
    };

    match ctx.call(ctx.api.delete_health_check(&lb.id, &check.id)).await {
        Ok(()) => info!("Deleting health check {} on load balancer {}", check.id, lb.id),
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    }

    let api = ctx.api;
    let (lb_id, check_id) = (lb.id.as_str(), check.id.as_str());
    ctx.wait_for(
        &format!("health check {} of load balancer {}", check_id, lb_id),
        states::DELETED,
        move || async move { api.get_health_check(lb_id, check_id).await.map(|hc| hc.state) },
    )
    .await
}
