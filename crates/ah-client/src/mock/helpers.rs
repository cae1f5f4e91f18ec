//! Fixture builders for Advanced Hosting models
//!
//! Used by the mock to materialize create requests, and by downstream tests
//! to seed the mock with already-converged load balancers.

use crate::models::*;

/// Active load balancer with one public address and no sub-resources
pub fn load_balancer(id: &str, name: &str) -> LoadBalancer {
    LoadBalancer {
        id: id.to_string(),
        name: name.to_string(),
        state: states::ACTIVE.to_string(),
        balancing_algorithm: "round_robin".to_string(),
        datacenter_id: Some("dc-1".to_string()),
        ip_addresses: vec![public_ip(&format!("{}-ip", id), "203.0.113.10")],
        forwarding_rules: vec![],
        health_checks: vec![],
        backend_nodes: vec![],
        created_at: None,
    }
}

pub fn public_ip(id: &str, address: &str) -> LbIpAddress {
    LbIpAddress {
        id: id.to_string(),
        address: address.to_string(),
        address_type: "public".to_string(),
    }
}

pub fn rule_request(
    request_protocol: &str,
    request_port: u16,
    communication_protocol: &str,
    communication_port: u16,
) -> ForwardingRuleCreateRequest {
    ForwardingRuleCreateRequest {
        request_protocol: request_protocol.to_string(),
        request_port,
        communication_protocol: communication_protocol.to_string(),
        communication_port,
    }
}

/// Active forwarding rule built from a create request
pub fn rule_from_request(id: &str, request: &ForwardingRuleCreateRequest) -> ForwardingRule {
    ForwardingRule {
        id: id.to_string(),
        request_protocol: request.request_protocol.clone(),
        request_port: request.request_port,
        communication_protocol: request.communication_protocol.clone(),
        communication_port: request.communication_port,
        state: states::ACTIVE.to_string(),
    }
}

/// Active TCP forwarding rule `port -> node_port`
pub fn forwarding_rule(id: &str, port: u16, node_port: u16) -> ForwardingRule {
    rule_from_request(id, &rule_request("tcp", port, "tcp", node_port))
}

/// HTTP health check policy probing `/healthz` on `port`
pub fn health_check_request(port: u16) -> HealthCheckRequest {
    HealthCheckRequest {
        check_type: "http".to_string(),
        url: "/healthz".to_string(),
        interval: 10,
        timeout: 5,
        unhealthy_threshold: 3,
        healthy_threshold: 2,
        port,
    }
}

/// Active health check built from a policy
pub fn health_check_from_request(id: &str, request: &HealthCheckRequest) -> HealthCheck {
    HealthCheck {
        id: id.to_string(),
        check_type: request.check_type.clone(),
        url: request.url.clone(),
        interval: request.interval,
        timeout: request.timeout,
        unhealthy_threshold: request.unhealthy_threshold,
        healthy_threshold: request.healthy_threshold,
        port: request.port,
        state: states::ACTIVE.to_string(),
    }
}

/// Active backend node
pub fn backend_node(id: &str, cloud_server_id: &str) -> BackendNode {
    BackendNode {
        id: id.to_string(),
        cloud_server_id: cloud_server_id.to_string(),
        state: states::ACTIVE.to_string(),
    }
}

/// Create request with TCP rules `port -> 30000 + port` and the given servers
pub fn create_request(name: &str, ports: &[u16], cloud_server_ids: &[&str]) -> LoadBalancerCreateRequest {
    LoadBalancerCreateRequest {
        name: name.to_string(),
        datacenter_id: "dc-1".to_string(),
        create_public_ip_address: true,
        private_network_ids: vec![],
        balancing_algorithm: "round_robin".to_string(),
        forwarding_rules: ports
            .iter()
            .map(|port| rule_request("tcp", *port, "tcp", 30000 + *port))
            .collect(),
        health_checks: vec![],
        backend_nodes: cloud_server_ids
            .iter()
            .map(|id| BackendNodeCreateRequest { cloud_server_id: id.to_string() })
            .collect(),
    }
}
