//! LoadBalancersApi trait for mocking
//!
//! This trait abstracts the Advanced Hosting client to enable mocking in unit tests.
//! The concrete AhClient implements this trait, and tests use MockLoadBalancersClient.

use crate::error::AhError;
use crate::models::*;

/// Trait for Advanced Hosting load balancer operations
///
/// Every `get_*` method reports a missing object as [`AhError::NotFound`],
/// never as a generic API error. All async methods must be `Send` to work with
/// Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait LoadBalancersApi: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    // Load balancers
    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, AhError>;
    async fn list_load_balancers(&self, filters: &[(&str, &str)]) -> Result<Vec<LoadBalancer>, AhError>;
    async fn create_load_balancer(&self, request: &LoadBalancerCreateRequest) -> Result<LoadBalancer, AhError>;
    async fn update_load_balancer(&self, id: &str, request: &LoadBalancerUpdateRequest) -> Result<(), AhError>;
    async fn delete_load_balancer(&self, id: &str) -> Result<(), AhError>;

    // Forwarding rules (no update: replace by delete + create)
    async fn create_forwarding_rule(&self, lb_id: &str, request: &ForwardingRuleCreateRequest) -> Result<ForwardingRule, AhError>;
    async fn get_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<ForwardingRule, AhError>;
    async fn delete_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<(), AhError>;

    // Health checks
    async fn create_health_check(&self, lb_id: &str, request: &HealthCheckRequest) -> Result<HealthCheck, AhError>;
    async fn get_health_check(&self, lb_id: &str, check_id: &str) -> Result<HealthCheck, AhError>;
    async fn update_health_check(&self, lb_id: &str, check_id: &str, request: &HealthCheckRequest) -> Result<(), AhError>;
    async fn delete_health_check(&self, lb_id: &str, check_id: &str) -> Result<(), AhError>;

    // Backend nodes
    async fn add_backend_nodes(&self, lb_id: &str, cloud_server_ids: &[String]) -> Result<Vec<BackendNode>, AhError>;
    async fn list_backend_nodes(&self, lb_id: &str) -> Result<Vec<BackendNode>, AhError>;
    async fn get_backend_node(&self, lb_id: &str, node_id: &str) -> Result<BackendNode, AhError>;
    async fn delete_backend_node(&self, lb_id: &str, node_id: &str) -> Result<(), AhError>;

    // Cluster lookups
    async fn list_datacenters(&self) -> Result<Vec<Datacenter>, AhError>;
    async fn list_private_networks(&self, filters: &[(&str, &str)]) -> Result<Vec<PrivateNetwork>, AhError>;
}
