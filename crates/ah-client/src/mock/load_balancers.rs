//! Load balancer operations for MockLoadBalancersClient
//!
//! Handles load balancer CRUD plus the datacenter and private network lookups

use super::helpers;
use super::MockLoadBalancersClient;
use crate::error::AhError;
use crate::models::*;

fn not_found(id: &str) -> AhError {
    AhError::NotFound(format!("Load balancer {} not found", id))
}

pub fn get_load_balancer(client: &MockLoadBalancersClient, id: &str) -> Result<LoadBalancer, AhError> {
    let mut lbs = client.load_balancers.lock().unwrap();
    let lb = lbs.get_mut(id).ok_or_else(|| not_found(id))?;

    if client.observe(id) {
        if lb.state == states::DELETING {
            lbs.remove(id);
            return Err(not_found(id));
        }
        lb.state = states::ACTIVE.to_string();
    }
    Ok(lb.clone())
}

pub fn list_load_balancers(client: &MockLoadBalancersClient, filters: &[(&str, &str)]) -> Vec<LoadBalancer> {
    let lbs = client.load_balancers.lock().unwrap();
    let mut matching: Vec<LoadBalancer> = lbs
        .values()
        .filter(|lb| {
            filters.iter().all(|(key, value)| match *key {
                "id" => lb.id == *value,
                "name" => lb.name == *value,
                "state" => lb.state == *value,
                _ => false,
            })
        })
        .cloned()
        .collect();
    matching.sort_by(|a, b| a.id.cmp(&b.id));
    matching
}

pub fn create_load_balancer(client: &MockLoadBalancersClient, request: &LoadBalancerCreateRequest) -> LoadBalancer {
    let id = client.next_id("lb");
    let state = client.begin_transition(&id, states::CREATING, states::ACTIVE);

    let mut ip_addresses = Vec::new();
    if request.create_public_ip_address {
        let ip_id = client.next_id("ip");
        let host = 10 + client.load_balancers.lock().unwrap().len();
        ip_addresses.push(helpers::public_ip(&ip_id, &format!("203.0.113.{}", host)));
    }

    let forwarding_rules = request
        .forwarding_rules
        .iter()
        .map(|fr| helpers::rule_from_request(&client.next_id("fr"), fr))
        .collect();
    let health_checks = request
        .health_checks
        .iter()
        .map(|hc| helpers::health_check_from_request(&client.next_id("hc"), hc))
        .collect();
    let backend_nodes = request
        .backend_nodes
        .iter()
        .map(|bn| helpers::backend_node(&client.next_id("bn"), &bn.cloud_server_id))
        .collect();

    let lb = LoadBalancer {
        id: id.clone(),
        name: request.name.clone(),
        state,
        balancing_algorithm: request.balancing_algorithm.clone(),
        datacenter_id: Some(request.datacenter_id.clone()),
        ip_addresses,
        forwarding_rules,
        health_checks,
        backend_nodes,
        created_at: Some(chrono::Utc::now()),
    };

    client.load_balancers.lock().unwrap().insert(id, lb.clone());
    lb
}

pub fn update_load_balancer(
    client: &MockLoadBalancersClient,
    id: &str,
    request: &LoadBalancerUpdateRequest,
) -> Result<(), AhError> {
    let mut lbs = client.load_balancers.lock().unwrap();
    let lb = lbs.get_mut(id).ok_or_else(|| not_found(id))?;
    if lb.state != states::ACTIVE {
        return Err(AhError::InvalidRequest(format!(
            "Load balancer {} is {}, not active",
            id, lb.state
        )));
    }

    if let Some(name) = &request.name {
        lb.name = name.clone();
    }
    if let Some(algorithm) = &request.balancing_algorithm {
        lb.balancing_algorithm = algorithm.clone();
    }
    lb.state = client.begin_transition(id, states::UPDATING, states::ACTIVE);
    Ok(())
}

pub fn delete_load_balancer(client: &MockLoadBalancersClient, id: &str) -> Result<(), AhError> {
    let mut lbs = client.load_balancers.lock().unwrap();
    let lb = lbs.get_mut(id).ok_or_else(|| not_found(id))?;

    if client.begin_transition(id, states::DELETING, states::DELETED) == states::DELETED {
        lbs.remove(id);
    } else {
        lb.state = states::DELETING.to_string();
    }
    Ok(())
}

pub fn list_private_networks(client: &MockLoadBalancersClient, filters: &[(&str, &str)]) -> Vec<PrivateNetwork> {
    client
        .private_networks
        .lock()
        .unwrap()
        .iter()
        .filter(|network| {
            filters.iter().all(|(key, value)| match *key {
                "id" => network.id == *value,
                "number" => network.number == *value,
                "name" => network.name == *value,
                _ => false,
            })
        })
        .cloned()
        .collect()
}

/// Look up an active load balancer for a sub-resource mutation
pub fn with_active_load_balancer<T>(
    client: &MockLoadBalancersClient,
    id: &str,
    mutate: impl FnOnce(&mut LoadBalancer) -> Result<T, AhError>,
) -> Result<T, AhError> {
    let mut lbs = client.load_balancers.lock().unwrap();
    let lb = lbs.get_mut(id).ok_or_else(|| not_found(id))?;
    if lb.state != states::ACTIVE {
        return Err(AhError::InvalidRequest(format!(
            "Load balancer {} is {}, sub-resources cannot change",
            id, lb.state
        )));
    }
    mutate(lb)
}

/// Look up a load balancer in any state for a sub-resource read
pub fn with_load_balancer<T>(
    client: &MockLoadBalancersClient,
    id: &str,
    read: impl FnOnce(&mut LoadBalancer) -> Result<T, AhError>,
) -> Result<T, AhError> {
    let mut lbs = client.load_balancers.lock().unwrap();
    let lb = lbs.get_mut(id).ok_or_else(|| not_found(id))?;
    read(lb)
}
