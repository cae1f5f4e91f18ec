//! Advanced Hosting API models
//!
//! These models match the JSON documents of the `/api/v1/load_balancers`
//! endpoints and the datacenter/private network lookups used at startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle states reported by load balancers and their sub-resources.
pub mod states {
    /// Object is provisioned and usable
    pub const ACTIVE: &str = "active";
    /// Object is being provisioned
    pub const CREATING: &str = "creating";
    /// Object is applying an update
    pub const UPDATING: &str = "updating";
    /// Object is being removed
    pub const DELETING: &str = "deleting";
    /// Synthetic state: the object no longer exists
    pub const DELETED: &str = "deleted";
}

/// Managed load balancer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LoadBalancer {
    pub id: String,
    pub name: String,
    pub state: String,
    pub balancing_algorithm: String,
    #[serde(default)]
    pub datacenter_id: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<LbIpAddress>,
    #[serde(default)]
    pub forwarding_rules: Vec<ForwardingRule>,
    #[serde(default)]
    pub health_checks: Vec<HealthCheck>,
    #[serde(default)]
    pub backend_nodes: Vec<BackendNode>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl LoadBalancer {
    /// All addresses the load balancer answers on, in API order.
    pub fn addresses(&self) -> Vec<String> {
        self.ip_addresses.iter().map(|ip| ip.address.clone()).collect()
    }
}

/// IP address assigned to a load balancer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LbIpAddress {
    #[serde(default)]
    pub id: String,
    pub address: String,
    #[serde(rename = "type", default)]
    pub address_type: String,
}

/// Forwarding rule (listener): request side is public, communication side
/// is the backend port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardingRule {
    pub id: String,
    pub request_protocol: String,
    pub request_port: u16,
    pub communication_protocol: String,
    pub communication_port: u16,
    #[serde(default)]
    pub state: String,
}

/// Health check attached to a load balancer (at most one is used)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheck {
    pub id: String,
    #[serde(rename = "type")]
    pub check_type: String,
    #[serde(default)]
    pub url: String,
    pub interval: u32,
    pub timeout: u32,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
    pub port: u16,
    #[serde(default)]
    pub state: String,
}

/// Backend node: a cloud server receiving traffic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendNode {
    pub id: String,
    #[serde(default)]
    pub cloud_server_id: String,
    #[serde(default)]
    pub state: String,
}

/// Request body for creating a load balancer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadBalancerCreateRequest {
    pub name: String,
    pub datacenter_id: String,
    pub create_public_ip_address: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub private_network_ids: Vec<String>,
    pub balancing_algorithm: String,
    pub forwarding_rules: Vec<ForwardingRuleCreateRequest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<HealthCheckRequest>,
    pub backend_nodes: Vec<BackendNodeCreateRequest>,
}

/// Request body for updating a load balancer; only set fields are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadBalancerUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balancing_algorithm: Option<String>,
}

/// Request body for creating a forwarding rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardingRuleCreateRequest {
    pub request_protocol: String,
    pub request_port: u16,
    pub communication_protocol: String,
    pub communication_port: u16,
}

/// Request body for creating or updating a health check
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckRequest {
    #[serde(rename = "type")]
    pub check_type: String,
    pub url: String,
    pub interval: u32,
    pub timeout: u32,
    pub unhealthy_threshold: u32,
    pub healthy_threshold: u32,
    pub port: u16,
}

/// Backend node entry of a create request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendNodeCreateRequest {
    pub cloud_server_id: String,
}

/// Datacenter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Datacenter {
    pub id: String,
    pub name: String,
    pub slug: String,
}

/// Private network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivateNetwork {
    pub id: String,
    pub number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
}
