//! Advanced Hosting API client
//!
//! Implements the load balancer endpoints:
//! `/api/v1/load_balancers/{id}` with nested `forwarding_rules`,
//! `health_checks` and `backend_nodes` collections.

use crate::common::query::query_resources;
use crate::common::HttpClient;
use crate::error::AhError;
use crate::models::*;
use crate::ah_trait::LoadBalancersApi;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Advanced Hosting API client
#[derive(Debug, Clone)]
pub struct AhClient {
    http: HttpClient,
}

impl AhClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.websa.com")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, AhError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AhError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    fn lb_path(id: &str) -> String {
        format!("/api/v1/load_balancers/{}", id)
    }

    fn sub_path(lb_id: &str, collection: &str) -> String {
        format!("/api/v1/load_balancers/{}/{}", lb_id, collection)
    }

    fn sub_item_path(lb_id: &str, collection: &str, item_id: &str) -> String {
        format!("/api/v1/load_balancers/{}/{}/{}", lb_id, collection, item_id)
    }
}

#[async_trait::async_trait]
impl LoadBalancersApi for AhClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, AhError> {
        debug!("Fetching load balancer {}", id);
        self.http.get_wrapped(&Self::lb_path(id), "load_balancer").await
    }

    async fn list_load_balancers(&self, filters: &[(&str, &str)]) -> Result<Vec<LoadBalancer>, AhError> {
        query_resources(&self.http, "load_balancers", "load_balancers", filters).await
    }

    async fn create_load_balancer(&self, request: &LoadBalancerCreateRequest) -> Result<LoadBalancer, AhError> {
        debug!("Creating load balancer {}", request.name);
        let body = serde_json::json!({ "load_balancer": request });
        self.http.post_wrapped("/api/v1/load_balancers", &body, "load_balancer").await
    }

    async fn update_load_balancer(&self, id: &str, request: &LoadBalancerUpdateRequest) -> Result<(), AhError> {
        debug!("Updating load balancer {}", id);
        let body = serde_json::json!({ "load_balancer": request });
        self.http.patch(&Self::lb_path(id), &body).await
    }

    async fn delete_load_balancer(&self, id: &str) -> Result<(), AhError> {
        debug!("Deleting load balancer {}", id);
        self.http.delete(&Self::lb_path(id)).await
    }

    async fn create_forwarding_rule(&self, lb_id: &str, request: &ForwardingRuleCreateRequest) -> Result<ForwardingRule, AhError> {
        let body = serde_json::json!({ "forwarding_rule": request });
        self.http
            .post_wrapped(&Self::sub_path(lb_id, "forwarding_rules"), &body, "forwarding_rule")
            .await
    }

    async fn get_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<ForwardingRule, AhError> {
        self.http
            .get_wrapped(&Self::sub_item_path(lb_id, "forwarding_rules", rule_id), "forwarding_rule")
            .await
    }

    async fn delete_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<(), AhError> {
        self.http
            .delete(&Self::sub_item_path(lb_id, "forwarding_rules", rule_id))
            .await
    }

    async fn create_health_check(&self, lb_id: &str, request: &HealthCheckRequest) -> Result<HealthCheck, AhError> {
        let body = serde_json::json!({ "health_check": request });
        self.http
            .post_wrapped(&Self::sub_path(lb_id, "health_checks"), &body, "health_check")
            .await
    }

    async fn get_health_check(&self, lb_id: &str, check_id: &str) -> Result<HealthCheck, AhError> {
        self.http
            .get_wrapped(&Self::sub_item_path(lb_id, "health_checks", check_id), "health_check")
            .await
    }

    async fn update_health_check(&self, lb_id: &str, check_id: &str, request: &HealthCheckRequest) -> Result<(), AhError> {
        let body = serde_json::json!({ "health_check": request });
        self.http
            .patch(&Self::sub_item_path(lb_id, "health_checks", check_id), &body)
            .await
    }

    async fn delete_health_check(&self, lb_id: &str, check_id: &str) -> Result<(), AhError> {
        self.http
            .delete(&Self::sub_item_path(lb_id, "health_checks", check_id))
            .await
    }

    async fn add_backend_nodes(&self, lb_id: &str, cloud_server_ids: &[String]) -> Result<Vec<BackendNode>, AhError> {
        if cloud_server_ids.is_empty() {
            return Err(AhError::InvalidRequest("no cloud servers to add".to_string()));
        }
        let nodes: Vec<BackendNodeCreateRequest> = cloud_server_ids
            .iter()
            .map(|id| BackendNodeCreateRequest { cloud_server_id: id.clone() })
            .collect();
        let body = serde_json::json!({ "backend_nodes": nodes });
        self.http
            .post_wrapped(&Self::sub_path(lb_id, "backend_nodes"), &body, "backend_nodes")
            .await
    }

    async fn list_backend_nodes(&self, lb_id: &str) -> Result<Vec<BackendNode>, AhError> {
        self.http
            .get_wrapped(&Self::sub_path(lb_id, "backend_nodes"), "backend_nodes")
            .await
    }

    async fn get_backend_node(&self, lb_id: &str, node_id: &str) -> Result<BackendNode, AhError> {
        self.http
            .get_wrapped(&Self::sub_item_path(lb_id, "backend_nodes", node_id), "backend_node")
            .await
    }

    async fn delete_backend_node(&self, lb_id: &str, node_id: &str) -> Result<(), AhError> {
        self.http
            .delete(&Self::sub_item_path(lb_id, "backend_nodes", node_id))
            .await
    }

    async fn list_datacenters(&self) -> Result<Vec<Datacenter>, AhError> {
        query_resources(&self.http, "datacenters", "datacenters", &[]).await
    }

    async fn list_private_networks(&self, filters: &[(&str, &str)]) -> Result<Vec<PrivateNetwork>, AhError> {
        query_resources(&self.http, "private_networks", "private_networks", filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = AhClient::new("https://api.websa.com/".to_string(), "token".to_string()).unwrap();
        assert_eq!(client.base_url(), "https://api.websa.com");
    }

    #[test]
    fn test_paths() {
        assert_eq!(AhClient::lb_path("lb-1"), "/api/v1/load_balancers/lb-1");
        assert_eq!(
            AhClient::sub_item_path("lb-1", "forwarding_rules", "fr-2"),
            "/api/v1/load_balancers/lb-1/forwarding_rules/fr-2"
        );
    }

    #[tokio::test]
    async fn test_add_backend_nodes_rejects_empty_batch() {
        let client = AhClient::new("https://api.websa.com".to_string(), "token".to_string()).unwrap();
        let result = client.add_backend_nodes("lb-1", &[]).await;
        assert!(matches!(result, Err(AhError::InvalidRequest(_))));
    }
}
