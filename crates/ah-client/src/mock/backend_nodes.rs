//! Backend node operations for MockLoadBalancersClient

use super::helpers;
use super::load_balancers::{with_active_load_balancer, with_load_balancer};
use super::MockLoadBalancersClient;
use crate::error::AhError;
use crate::models::*;

fn node_not_found(lb_id: &str, node_id: &str) -> AhError {
    AhError::NotFound(format!("Backend node {} of load balancer {} not found", node_id, lb_id))
}

/// Apply a settled transition to the node at `index`; false when it disappeared
fn settle_node(client: &MockLoadBalancersClient, nodes: &mut Vec<BackendNode>, index: usize) -> bool {
    if !client.observe(&nodes[index].id) {
        return true;
    }
    if nodes[index].state == states::DELETING {
        nodes.remove(index);
        return false;
    }
    nodes[index].state = states::ACTIVE.to_string();
    true
}

pub fn add_backend_nodes(
    client: &MockLoadBalancersClient,
    lb_id: &str,
    cloud_server_ids: &[String],
) -> Result<Vec<BackendNode>, AhError> {
    if cloud_server_ids.is_empty() {
        return Err(AhError::InvalidRequest("no cloud servers to add".to_string()));
    }

    with_active_load_balancer(client, lb_id, |lb| {
        if let Some(duplicate) = cloud_server_ids
            .iter()
            .find(|id| lb.backend_nodes.iter().any(|bn| &bn.cloud_server_id == *id))
        {
            return Err(AhError::InvalidRequest(format!(
                "Cloud server {} is already a backend node",
                duplicate
            )));
        }

        let mut added = Vec::with_capacity(cloud_server_ids.len());
        for cloud_server_id in cloud_server_ids {
            let id = client.next_id("bn");
            let mut node = helpers::backend_node(&id, cloud_server_id);
            node.state = client.begin_transition(&id, states::CREATING, states::ACTIVE);
            lb.backend_nodes.push(node.clone());
            added.push(node);
        }
        Ok(added)
    })
}

pub fn list_backend_nodes(client: &MockLoadBalancersClient, lb_id: &str) -> Result<Vec<BackendNode>, AhError> {
    with_load_balancer(client, lb_id, |lb| {
        let mut index = 0;
        while index < lb.backend_nodes.len() {
            if settle_node(client, &mut lb.backend_nodes, index) {
                index += 1;
            }
        }
        Ok(lb.backend_nodes.clone())
    })
}

pub fn get_backend_node(client: &MockLoadBalancersClient, lb_id: &str, node_id: &str) -> Result<BackendNode, AhError> {
    with_load_balancer(client, lb_id, |lb| {
        let index = lb
            .backend_nodes
            .iter()
            .position(|bn| bn.id == node_id)
            .ok_or_else(|| node_not_found(lb_id, node_id))?;

        if settle_node(client, &mut lb.backend_nodes, index) {
            Ok(lb.backend_nodes[index].clone())
        } else {
            Err(node_not_found(lb_id, node_id))
        }
    })
}

pub fn delete_backend_node(client: &MockLoadBalancersClient, lb_id: &str, node_id: &str) -> Result<(), AhError> {
    with_active_load_balancer(client, lb_id, |lb| {
        let index = lb
            .backend_nodes
            .iter()
            .position(|bn| bn.id == node_id)
            .ok_or_else(|| node_not_found(lb_id, node_id))?;

        if client.begin_transition(node_id, states::DELETING, states::DELETED) == states::DELETED {
            lb.backend_nodes.remove(index);
        } else {
            lb.backend_nodes[index].state = states::DELETING.to_string();
        }
        Ok(())
    })
}
