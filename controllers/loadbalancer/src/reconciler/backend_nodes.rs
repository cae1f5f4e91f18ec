//! Backend node convergence.
//!
//! Nodes are identified by the cloud server they point at, not by the id the
//! API assigns them. Additions go out as one batch; removals one at a time.

use super::poller::SyncContext;
use crate::error::ReconcileError;
use ah_client::{states, BackendNode, LoadBalancer};
use std::collections::BTreeSet;
use tracing::info;

/// State reported for an added node that does not show up in the list yet
const PENDING: &str = "pending";

/// Make the backend nodes of `lb` point at exactly `targets`.
pub async fn sync(ctx: &SyncContext<'_>, lb: &LoadBalancer, targets: &[String]) -> Result<(), ReconcileError> {
    let existing: BTreeSet<&str> = lb
        .backend_nodes
        .iter()
        .map(|node| node.cloud_server_id.as_str())
        .collect();
    let desired: BTreeSet<&str> = targets.iter().map(String::as_str).collect();

    let additions: Vec<String> = targets
        .iter()
        .filter(|target| !existing.contains(target.as_str()))
        .cloned()
        .collect();
    // Every node of an undesired target goes, duplicates included
    let mut removals: Vec<&BackendNode> = lb
        .backend_nodes
        .iter()
        .filter(|node| !desired.contains(node.cloud_server_id.as_str()))
        .collect();
    removals.sort_by(|a, b| (&a.cloud_server_id, &a.id).cmp(&(&b.cloud_server_id, &b.id)));

    if !additions.is_empty() {
        add(ctx, &lb.id, &additions).await?;
    }
    for node in removals {
        remove(ctx, &lb.id, node).await?;
    }
    Ok(())
}

/// Aggregate state of the nodes watched after a batched add.
///
/// Each watched entry is the id returned by the add call, when there was one,
/// and the cloud server id. A watched node missing from `nodes` is pending.
pub fn aggregate_state(nodes: &[BackendNode], watched: &[(Option<String>, String)]) -> String {
    for (node_id, target) in watched {
        let found = nodes.iter().find(|node| match node_id {
            Some(id) => &node.id == id,
            None => &node.cloud_server_id == target,
        });
        match found {
            Some(node) if node.state == states::ACTIVE => {}
            Some(node) => return node.state.clone(),
            None => return PENDING.to_string(),
        }
    }
    states::ACTIVE.to_string()
}

async fn add(ctx: &SyncContext<'_>, lb_id: &str, additions: &[String]) -> Result<(), ReconcileError> {
    let added = ctx.call(ctx.api.add_backend_nodes(lb_id, additions)).await?;
    info!(
        "Adding backend nodes [{}] to load balancer {}",
        additions.join(", "),
        lb_id
    );

    let watched: Vec<(Option<String>, String)> = additions
        .iter()
        .map(|target| {
            let node_id = added
                .iter()
                .find(|node| &node.cloud_server_id == target)
                .map(|node| node.id.clone());
            (node_id, target.clone())
        })
        .collect();

    let api = ctx.api;
    let watched = watched.as_slice();
    ctx.wait_for(
        &format!("backend nodes of load balancer {}", lb_id),
        states::ACTIVE,
        move || async move {
            api.list_backend_nodes(lb_id)
                .await
                .map(|nodes| aggregate_state(&nodes, watched))
        },
    )
    .await
}

async fn remove(ctx: &SyncContext<'_>, lb_id: &str, node: &BackendNode) -> Result<(), ReconcileError> {
    info!(
        "Removing backend node {} (server {}) from load balancer {}",
        node.id, node.cloud_server_id, lb_id
    );
    ctx.call(ctx.api.delete_backend_node(lb_id, &node.id)).await?;

    let api = ctx.api;
    let node_id = node.id.as_str();
    ctx.wait_for(
        &format!("backend node {} of load balancer {}", node_id, lb_id),
        states::DELETED,
        move || async move { api.get_backend_node(lb_id, node_id).await.map(|bn| bn.state) },
    )
    .await
}
