//! Mock Advanced Hosting client for unit testing
//!
//! This module provides an in-memory implementation of [`LoadBalancersApi`]
//! that behaves like the asynchronous platform: every mutation leaves the
//! object in a transitional state (`creating`, `updating`, `deleting`) which
//! settles after a configurable number of observations.
//!
//! An object is observed when it is fetched individually (`get_*`) or, for
//! backend nodes, when the node list is fetched. Listing load balancers does
//! not advance transitions.
//!
//! The mock is organized into domain-specific modules:
//! - `load_balancers.rs` - load balancer CRUD and cluster lookups
//! - `rules.rs` - forwarding rules and the health check
//! - `backend_nodes.rs` - batched add, list, get and delete of backend nodes
//! - `helpers.rs` - fixture builders shared with downstream tests

pub mod helpers;
mod backend_nodes;
mod load_balancers;
mod rules;

use crate::error::AhError;
use crate::models::*;
use crate::ah_trait::LoadBalancersApi;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type FailureFactory = Arc<dyn Fn() -> AhError + Send + Sync>;

/// A call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    GetLoadBalancer { id: String },
    ListLoadBalancers { filters: Vec<(String, String)> },
    CreateLoadBalancer { name: String },
    UpdateLoadBalancer { id: String, request: LoadBalancerUpdateRequest },
    DeleteLoadBalancer { id: String },
    CreateForwardingRule { lb_id: String, request_port: u16 },
    GetForwardingRule { lb_id: String, rule_id: String },
    DeleteForwardingRule { lb_id: String, rule_id: String },
    CreateHealthCheck { lb_id: String },
    GetHealthCheck { lb_id: String, check_id: String },
    UpdateHealthCheck { lb_id: String, check_id: String },
    DeleteHealthCheck { lb_id: String, check_id: String },
    AddBackendNodes { lb_id: String, cloud_server_ids: Vec<String> },
    ListBackendNodes { lb_id: String },
    GetBackendNode { lb_id: String, node_id: String },
    DeleteBackendNode { lb_id: String, node_id: String },
    ListDatacenters,
    ListPrivateNetworks { filters: Vec<(String, String)> },
}

impl MockCall {
    /// Trait method name, as accepted by [`MockLoadBalancersClient::fail_on`]
    pub fn method(&self) -> &'static str {
        match self {
            MockCall::GetLoadBalancer { .. } => "get_load_balancer",
            MockCall::ListLoadBalancers { .. } => "list_load_balancers",
            MockCall::CreateLoadBalancer { .. } => "create_load_balancer",
            MockCall::UpdateLoadBalancer { .. } => "update_load_balancer",
            MockCall::DeleteLoadBalancer { .. } => "delete_load_balancer",
            MockCall::CreateForwardingRule { .. } => "create_forwarding_rule",
            MockCall::GetForwardingRule { .. } => "get_forwarding_rule",
            MockCall::DeleteForwardingRule { .. } => "delete_forwarding_rule",
            MockCall::CreateHealthCheck { .. } => "create_health_check",
            MockCall::GetHealthCheck { .. } => "get_health_check",
            MockCall::UpdateHealthCheck { .. } => "update_health_check",
            MockCall::DeleteHealthCheck { .. } => "delete_health_check",
            MockCall::AddBackendNodes { .. } => "add_backend_nodes",
            MockCall::ListBackendNodes { .. } => "list_backend_nodes",
            MockCall::GetBackendNode { .. } => "get_backend_node",
            MockCall::DeleteBackendNode { .. } => "delete_backend_node",
            MockCall::ListDatacenters => "list_datacenters",
            MockCall::ListPrivateNetworks { .. } => "list_private_networks",
        }
    }

    /// Whether the call changes remote state
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            MockCall::CreateLoadBalancer { .. }
                | MockCall::UpdateLoadBalancer { .. }
                | MockCall::DeleteLoadBalancer { .. }
                | MockCall::CreateForwardingRule { .. }
                | MockCall::DeleteForwardingRule { .. }
                | MockCall::CreateHealthCheck { .. }
                | MockCall::UpdateHealthCheck { .. }
                | MockCall::DeleteHealthCheck { .. }
                | MockCall::AddBackendNodes { .. }
                | MockCall::DeleteBackendNode { .. }
        )
    }
}

fn owned_filters(filters: &[(&str, &str)]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Mock Advanced Hosting client for testing
///
/// Clones share the same store, so a test can keep one handle for assertions
/// while the code under test owns another.
#[derive(Clone)]
pub struct MockLoadBalancersClient {
    pub(crate) base_url: String,
    // In-memory storage for resources
    pub(crate) load_balancers: Arc<Mutex<HashMap<String, LoadBalancer>>>,
    pub(crate) datacenters: Arc<Mutex<Vec<Datacenter>>>,
    pub(crate) private_networks: Arc<Mutex<Vec<PrivateNetwork>>>,
    // Object id -> observations left before its transition settles
    pub(crate) pending: Arc<Mutex<HashMap<String, u32>>>,
    pub(crate) settle_after: u32,
    pub(crate) calls: Arc<Mutex<Vec<MockCall>>>,
    pub(crate) failures: Arc<Mutex<HashMap<String, FailureFactory>>>,
    // Counter for generating IDs
    pub(crate) next_id: Arc<Mutex<u64>>,
}

impl MockLoadBalancersClient {
    /// Create a new mock client; transitions settle on the first observation
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            load_balancers: Arc::new(Mutex::new(HashMap::new())),
            datacenters: Arc::new(Mutex::new(Vec::new())),
            private_networks: Arc::new(Mutex::new(Vec::new())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            settle_after: 1,
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Number of observations a transition needs before it settles.
    ///
    /// `0` applies every mutation synchronously.
    pub fn with_settle_after(mut self, observations: u32) -> Self {
        self.settle_after = observations;
        self
    }

    /// Add a load balancer to the mock store as-is (for test setup)
    pub fn add_load_balancer(&self, lb: LoadBalancer) {
        self.load_balancers.lock().unwrap().insert(lb.id.clone(), lb);
    }

    /// Add a datacenter to the mock store (for test setup)
    pub fn add_datacenter(&self, datacenter: Datacenter) {
        self.datacenters.lock().unwrap().push(datacenter);
    }

    /// Add a private network to the mock store (for test setup)
    pub fn add_private_network(&self, network: PrivateNetwork) {
        self.private_networks.lock().unwrap().push(network);
    }

    /// Snapshot of a stored load balancer without advancing any transition
    pub fn load_balancer(&self, id: &str) -> Option<LoadBalancer> {
        self.load_balancers.lock().unwrap().get(id).cloned()
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that changed remote state
    pub fn mutation_calls(&self) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(MockCall::is_mutation)
            .collect()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Make every call to `method` fail with the error built by `error`
    pub fn fail_on<F>(&self, method: &str, error: F)
    where
        F: Fn() -> AhError + Send + Sync + 'static,
    {
        self.failures
            .lock()
            .unwrap()
            .insert(method.to_string(), Arc::new(error));
    }

    /// Remove all injected failures
    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Record a call and return the injected failure for it, if any
    pub(crate) fn record(&self, call: MockCall) -> Result<(), AhError> {
        let method = call.method();
        self.calls.lock().unwrap().push(call);
        let failure = self.failures.lock().unwrap().get(method).cloned();
        match failure {
            Some(make_error) => Err(make_error()),
            None => Ok(()),
        }
    }

    /// Generate next ID
    pub(crate) fn next_id(&self, prefix: &str) -> String {
        let mut id = self.next_id.lock().unwrap();
        let current = *id;
        *id += 1;
        format!("{}-{}", prefix, current)
    }

    /// Put `id` into `transitional` state, or `settled` when transitions are synchronous
    pub(crate) fn begin_transition(&self, id: &str, transitional: &str, settled: &str) -> String {
        if self.settle_after == 0 {
            return settled.to_string();
        }
        self.pending
            .lock()
            .unwrap()
            .insert(id.to_string(), self.settle_after);
        transitional.to_string()
    }

    /// Count one observation of `id`; true when its transition settles now
    pub(crate) fn observe(&self, id: &str) -> bool {
        let mut pending = self.pending.lock().unwrap();
        match pending.get_mut(id) {
            Some(left) if *left > 1 => {
                *left -= 1;
                false
            }
            Some(_) => {
                pending.remove(id);
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl LoadBalancersApi for MockLoadBalancersClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_load_balancer(&self, id: &str) -> Result<LoadBalancer, AhError> {
        self.record(MockCall::GetLoadBalancer { id: id.to_string() })?;
        load_balancers::get_load_balancer(self, id)
    }

    async fn list_load_balancers(&self, filters: &[(&str, &str)]) -> Result<Vec<LoadBalancer>, AhError> {
        self.record(MockCall::ListLoadBalancers { filters: owned_filters(filters) })?;
        Ok(load_balancers::list_load_balancers(self, filters))
    }

    async fn create_load_balancer(&self, request: &LoadBalancerCreateRequest) -> Result<LoadBalancer, AhError> {
        self.record(MockCall::CreateLoadBalancer { name: request.name.clone() })?;
        Ok(load_balancers::create_load_balancer(self, request))
    }

    async fn update_load_balancer(&self, id: &str, request: &LoadBalancerUpdateRequest) -> Result<(), AhError> {
        self.record(MockCall::UpdateLoadBalancer { id: id.to_string(), request: request.clone() })?;
        load_balancers::update_load_balancer(self, id, request)
    }

    async fn delete_load_balancer(&self, id: &str) -> Result<(), AhError> {
        self.record(MockCall::DeleteLoadBalancer { id: id.to_string() })?;
        load_balancers::delete_load_balancer(self, id)
    }

    async fn create_forwarding_rule(&self, lb_id: &str, request: &ForwardingRuleCreateRequest) -> Result<ForwardingRule, AhError> {
        self.record(MockCall::CreateForwardingRule {
            lb_id: lb_id.to_string(),
            request_port: request.request_port,
        })?;
        rules::create_forwarding_rule(self, lb_id, request)
    }

    async fn get_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<ForwardingRule, AhError> {
        self.record(MockCall::GetForwardingRule {
            lb_id: lb_id.to_string(),
            rule_id: rule_id.to_string(),
        })?;
        rules::get_forwarding_rule(self, lb_id, rule_id)
    }

    async fn delete_forwarding_rule(&self, lb_id: &str, rule_id: &str) -> Result<(), AhError> {
        self.record(MockCall::DeleteForwardingRule {
            lb_id: lb_id.to_string(),
            rule_id: rule_id.to_string(),
        })?;
        rules::delete_forwarding_rule(self, lb_id, rule_id)
    }

    async fn create_health_check(&self, lb_id: &str, request: &HealthCheckRequest) -> Result<HealthCheck, AhError> {
        self.record(MockCall::CreateHealthCheck { lb_id: lb_id.to_string() })?;
        rules::create_health_check(self, lb_id, request)
    }

    async fn get_health_check(&self, lb_id: &str, check_id: &str) -> Result<HealthCheck, AhError> {
        self.record(MockCall::GetHealthCheck {
            lb_id: lb_id.to_string(),
            check_id: check_id.to_string(),
        })?;
        rules::get_health_check(self, lb_id, check_id)
    }

    async fn update_health_check(&self, lb_id: &str, check_id: &str, request: &HealthCheckRequest) -> Result<(), AhError> {
        self.record(MockCall::UpdateHealthCheck {
            lb_id: lb_id.to_string(),
            check_id: check_id.to_string(),
        })?;
        rules::update_health_check(self, lb_id, check_id, request)
    }

    async fn delete_health_check(&self, lb_id: &str, check_id: &str) -> Result<(), AhError> {
        self.record(MockCall::DeleteHealthCheck {
            lb_id: lb_id.to_string(),
            check_id: check_id.to_string(),
        })?;
        rules::delete_health_check(self, lb_id, check_id)
    }

    async fn add_backend_nodes(&self, lb_id: &str, cloud_server_ids: &[String]) -> Result<Vec<BackendNode>, AhError> {
        self.record(MockCall::AddBackendNodes {
            lb_id: lb_id.to_string(),
            cloud_server_ids: cloud_server_ids.to_vec(),
        })?;
        backend_nodes::add_backend_nodes(self, lb_id, cloud_server_ids)
    }

    async fn list_backend_nodes(&self, lb_id: &str) -> Result<Vec<BackendNode>, AhError> {
        self.record(MockCall::ListBackendNodes { lb_id: lb_id.to_string() })?;
        backend_nodes::list_backend_nodes(self, lb_id)
    }

    async fn get_backend_node(&self, lb_id: &str, node_id: &str) -> Result<BackendNode, AhError> {
        self.record(MockCall::GetBackendNode {
            lb_id: lb_id.to_string(),
            node_id: node_id.to_string(),
        })?;
        backend_nodes::get_backend_node(self, lb_id, node_id)
    }

    async fn delete_backend_node(&self, lb_id: &str, node_id: &str) -> Result<(), AhError> {
        self.record(MockCall::DeleteBackendNode {
            lb_id: lb_id.to_string(),
            node_id: node_id.to_string(),
        })?;
        backend_nodes::delete_backend_node(self, lb_id, node_id)
    }

    async fn list_datacenters(&self) -> Result<Vec<Datacenter>, AhError> {
        self.record(MockCall::ListDatacenters)?;
        Ok(self.datacenters.lock().unwrap().clone())
    }

    async fn list_private_networks(&self, filters: &[(&str, &str)]) -> Result<Vec<PrivateNetwork>, AhError> {
        self.record(MockCall::ListPrivateNetworks { filters: owned_filters(filters) })?;
        Ok(load_balancers::list_private_networks(self, filters))
    }
}
