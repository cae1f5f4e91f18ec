//! Forwarding rule convergence.
//!
//! Rules are identified by their public port. The API has no update for
//! rules, so a changed rule is deleted and created again.

use super::poller::SyncContext;
use crate::desired::ListenerMapping;
use crate::error::ReconcileError;
use ah_client::{states, ForwardingRule, LoadBalancer};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Make the rules of `lb` match `listeners`.
///
/// Listeners are applied in order; leftover rules are removed afterwards in
/// ascending port order.
pub async fn sync(ctx: &SyncContext<'_>, lb: &LoadBalancer, listeners: &[ListenerMapping]) -> Result<(), ReconcileError> {
    let mut existing: BTreeMap<u16, &ForwardingRule> = lb
        .forwarding_rules
        .iter()
        .map(|rule| (rule.request_port, rule))
        .collect();

    for listener in listeners {
        match existing.remove(&listener.external_port) {
            None => create(ctx, &lb.id, listener).await?,
            Some(rule) if listener.matches(rule) => {
                debug!("Forwarding rule {} for port {} is up to date", rule.id, rule.request_port);
            }
            Some(rule) => {
                info!(
                    "Replacing forwarding rule {} for port {} on load balancer {}",
                    rule.id, rule.request_port, lb.id
                );
                remove(ctx, &lb.id, rule).await?;
                create(ctx, &lb.id, listener).await?;
            }
        }
    }

    for rule in existing.into_values() {
        remove(ctx, &lb.id, rule).await?;
    }
    Ok(())
}

async fn create(ctx: &SyncContext<'_>, lb_id: &str, listener: &ListenerMapping) -> Result<(), ReconcileError> {
    let rule = ctx
        .call(ctx.api.create_forwarding_rule(lb_id, &listener.request()))
        .await?;
    info!(
        "Created forwarding rule {} ({}:{} -> {}:{}) on load balancer {}",
        rule.id,
        listener.external_protocol,
        listener.external_port,
        listener.internal_protocol,
        listener.internal_port,
        lb_id
    );

    let api = ctx.api;
    let rule_id = rule.id.as_str();
    ctx.wait_for(
        &format!("forwarding rule {} of load balancer {}", rule_id, lb_id),
        states::ACTIVE,
        move || async move { api.get_forwarding_rule(lb_id, rule_id).await.map(|fr| fr.state) },
    )
    .await
}

async fn remove(ctx: &SyncContext<'_>, lb_id: &str, rule: &ForwardingRule) -> Result<(), ReconcileError> {
    info!(
        "Deleting forwarding rule {} for port {} on load balancer {}",
        rule.id, rule.request_port, lb_id
    );
    match ctx.call(ctx.api.delete_forwarding_rule(lb_id, &rule.id)).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e),
    }

    let api = ctx.api;
    let rule_id = rule.id.as_str();
    ctx.wait_for(
        &format!("forwarding rule {} of load balancer {}", rule_id, lb_id),
        states::DELETED,
        move || async move { api.get_forwarding_rule(lb_id, rule_id).await.map(|fr| fr.state) },
    )
    .await
}
