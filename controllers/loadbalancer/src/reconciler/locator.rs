//! Resolves a stored identifier to the remote load balancer.

use super::poller::SyncContext;
use crate::error::ReconcileError;
use ah_client::LoadBalancer;
use tracing::debug;

/// Load balancer with id `id`; `None` when the id is empty or unknown remotely.
pub async fn locate(ctx: &SyncContext<'_>, id: &str) -> Result<Option<LoadBalancer>, ReconcileError> {
    if id.is_empty() {
        debug!("No load balancer id stored");
        return Ok(None);
    }

    match ctx.call(ctx.api.get_load_balancer(id)).await {
        Ok(lb) => Ok(Some(lb)),
        Err(e) if e.is_not_found() => {
            debug!("Load balancer {} no longer exists", id);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// The single load balancer named `name`.
///
/// Used when no id was stored, to pick up a load balancer whose creation
/// succeeded but whose id never made it onto the object.
pub async fn locate_by_name(ctx: &SyncContext<'_>, name: &str) -> Result<Option<LoadBalancer>, ReconcileError> {
    let mut found: Vec<LoadBalancer> = ctx
        .call(ctx.api.list_load_balancers(&[("name", name)]))
        .await?
        .into_iter()
        .filter(|lb| lb.name == name)
        .collect();

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        count => Err(ReconcileError::AmbiguousName {
            name: name.to_string(),
            count,
        }),
    }
}
