//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and setting up test scenarios.

#[cfg(test)]
use crate::binder::{IdentityBinder, ObjectKey};
#[cfg(test)]
use crate::cluster::ClusterInfo;
#[cfg(test)]
use crate::desired::{DesiredSpec, ListenerMapping};
#[cfg(test)]
use crate::error::BindError;
#[cfg(test)]
use crate::reconciler::lifecycle::LoadBalancers;
#[cfg(test)]
use crate::reconciler::poller::{PollConfig, SyncContext};
#[cfg(test)]
use ah_client::{HealthCheckRequest, LoadBalancer, MockLoadBalancersClient};
#[cfg(test)]
use k8s_openapi::api::core::v1::{Node, NodeSpec, Service, ServicePort, ServiceSpec};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;
#[cfg(test)]
use tokio_util::sync::CancellationToken;

/// Uid of every test Service
#[cfg(test)]
pub const TEST_SERVICE_UID: &str = "1b2c3d4e-5f60-7182-93a4-b5c6d7e8f901";

/// Helper to create a test LoadBalancer Service
///
/// `ports` are `(port, nodePort)` pairs, all TCP.
#[cfg(test)]
pub fn create_test_service(
    name: &str,
    namespace: &str,
    ports: &[(i32, Option<i32>)],
    annotations: &[(&str, &str)],
) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(TEST_SERVICE_UID.to_string()),
            resource_version: Some("1".to_string()),
            annotations: Some(
                annotations
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            ports: Some(
                ports
                    .iter()
                    .map(|(port, node_port)| ServicePort {
                        port: *port,
                        node_port: *node_port,
                        protocol: Some("TCP".to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}

/// Helper to create a test Node
#[cfg(test)]
pub fn create_test_node(name: &str, provider_id: Option<&str>) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(NodeSpec {
            provider_id: provider_id.map(str::to_string),
            ..Default::default()
        }),
        status: None,
    }
}

#[cfg(test)]
pub fn cluster_info() -> ClusterInfo {
    ClusterInfo {
        datacenter_id: "dc-1".to_string(),
        private_network_id: "pn-1".to_string(),
    }
}

/// TCP listener `port -> node_port`
#[cfg(test)]
pub fn listener(port: u16, node_port: u16) -> ListenerMapping {
    ListenerMapping {
        external_protocol: "tcp".to_string(),
        external_port: port,
        internal_protocol: "tcp".to_string(),
        internal_port: node_port,
    }
}

/// Helper to create a desired state with TCP listeners and no health check
#[cfg(test)]
pub fn desired(name: &str, listeners: &[(u16, u16)], targets: &[&str]) -> DesiredSpec {
    DesiredSpec {
        name: name.to_string(),
        adoptable: true,
        datacenter_id: "dc-1".to_string(),
        private_network_id: Some("pn-1".to_string()),
        balancing_algorithm: "round_robin".to_string(),
        listeners: listeners.iter().map(|(p, np)| listener(*p, *np)).collect(),
        health_check: None,
        targets: targets.iter().map(|t| t.to_string()).collect(),
    }
}

/// HTTP health check policy on `port`
#[cfg(test)]
pub fn health_policy(port: u16) -> HealthCheckRequest {
    ah_client::mock::helpers::health_check_request(port)
}

/// Poll settings fast enough for unit tests
#[cfg(test)]
pub fn fast_poll() -> PollConfig {
    PollConfig::new(Duration::from_millis(1), Duration::from_secs(5))
}

/// Identity binder remembering every bind, optionally failing
#[cfg(test)]
#[derive(Default)]
pub struct RecordingBinder {
    pub bound: Mutex<Vec<(ObjectKey, String)>>,
    pub fail: bool,
}

#[cfg(test)]
impl RecordingBinder {
    pub fn failing() -> Self {
        Self {
            bound: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn bound(&self) -> Vec<(ObjectKey, String)> {
        self.bound.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl IdentityBinder for RecordingBinder {
    async fn bind(&self, object: &ObjectKey, load_balancer_id: &str) -> Result<(), BindError> {
        if self.fail {
            return Err(BindError::Rejected("conflict".to_string()));
        }
        self.bound
            .lock()
            .unwrap()
            .push((object.clone(), load_balancer_id.to_string()));
        Ok(())
    }
}

/// Engine over `mock` and `binder` with fast polls
#[cfg(test)]
pub fn test_engine(mock: &MockLoadBalancersClient, binder: Arc<RecordingBinder>) -> LoadBalancers {
    LoadBalancers::new(Arc::new(mock.clone()), binder, fast_poll())
}

#[cfg(test)]
pub fn service_key() -> ObjectKey {
    ObjectKey::new("default", "web")
}

/// Seed `mock` with an active load balancer carrying TCP rules `port -> node_port`
/// (ids `fr-<port>`) and backend nodes (ids `bn-<target>`)
#[cfg(test)]
pub fn seed_load_balancer(
    mock: &MockLoadBalancersClient,
    id: &str,
    name: &str,
    rules: &[(u16, u16)],
    targets: &[&str],
) -> LoadBalancer {
    use ah_client::mock::helpers;

    let mut lb = helpers::load_balancer(id, name);
    lb.forwarding_rules = rules
        .iter()
        .map(|(port, node_port)| helpers::forwarding_rule(&format!("fr-{}", port), *port, *node_port))
        .collect();
    lb.backend_nodes = targets
        .iter()
        .map(|target| helpers::backend_node(&format!("bn-{}", target), target))
        .collect();
    mock.add_load_balancer(lb.clone());
    lb
}

/// Sync context over `mock` for driving a single diff engine
#[cfg(test)]
pub struct TestContext {
    pub mock: MockLoadBalancersClient,
    pub poll: PollConfig,
    pub cancel: CancellationToken,
}

#[cfg(test)]
impl TestContext {
    pub fn new(mock: &MockLoadBalancersClient) -> Self {
        Self {
            mock: mock.clone(),
            poll: fast_poll(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn ctx(&self) -> SyncContext<'_> {
        SyncContext::new(&self.mock, &self.poll, &self.cancel)
    }
}
