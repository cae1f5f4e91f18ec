//! Desired load balancer state derived from a `LoadBalancer` Service.
//!
//! Everything that can be wrong with the Service is detected here, before the
//! engine makes its first API call.

use crate::cluster::ClusterInfo;
use crate::error::ReconcileError;
use ah_client::{
    BackendNodeCreateRequest, ForwardingRule, ForwardingRuleCreateRequest, HealthCheck, HealthCheckRequest,
    LoadBalancerCreateRequest,
};
use k8s_openapi::api::core::v1::Service;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Id of the Advanced Hosting load balancer backing the Service
pub const ANNOTATION_ID: &str = "service.beta.kubernetes.io/ah-loadbalancer-id";
/// Load balancer name
pub const ANNOTATION_NAME: &str = "service.beta.kubernetes.io/ah-loadbalancer-name";
/// Balancing algorithm
pub const ANNOTATION_BALANCING_ALGORITHM: &str = "service.beta.kubernetes.io/ah-loadbalancer-balancing-algorithm";
/// Enables the health check
pub const ANNOTATION_HEALTHCHECK_ENABLED: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-enabled";
pub const ANNOTATION_HEALTHCHECK_TYPE: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-type";
pub const ANNOTATION_HEALTHCHECK_URL: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-url";
pub const ANNOTATION_HEALTHCHECK_INTERVAL: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-interval";
pub const ANNOTATION_HEALTHCHECK_TIMEOUT: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-timeout";
pub const ANNOTATION_HEALTHCHECK_UNHEALTHY_THRESHOLD: &str =
    "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-unhealthy-threshold";
pub const ANNOTATION_HEALTHCHECK_HEALTHY_THRESHOLD: &str =
    "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-healthy-threshold";
pub const ANNOTATION_HEALTHCHECK_PORT: &str = "service.beta.kubernetes.io/ah-loadbalancer-healthcheck-port";

pub const DEFAULT_BALANCING_ALGORITHM: &str = "round_robin";

/// One listener: public protocol/port forwarded to a node protocol/port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerMapping {
    pub external_protocol: String,
    pub external_port: u16,
    pub internal_protocol: String,
    pub internal_port: u16,
}

impl ListenerMapping {
    /// Whether `rule` already implements this listener
    pub fn matches(&self, rule: &ForwardingRule) -> bool {
        rule.request_protocol == self.external_protocol
            && rule.request_port == self.external_port
            && rule.communication_protocol == self.internal_protocol
            && rule.communication_port == self.internal_port
    }

    pub fn request(&self) -> ForwardingRuleCreateRequest {
        ForwardingRuleCreateRequest {
            request_protocol: self.external_protocol.clone(),
            request_port: self.external_port,
            communication_protocol: self.internal_protocol.clone(),
            communication_port: self.internal_port,
        }
    }
}

/// Whether an existing health check already carries `policy`
pub fn health_check_matches(check: &HealthCheck, policy: &HealthCheckRequest) -> bool {
    check.check_type == policy.check_type
        && check.url == policy.url
        && check.interval == policy.interval
        && check.timeout == policy.timeout
        && check.unhealthy_threshold == policy.unhealthy_threshold
        && check.healthy_threshold == policy.healthy_threshold
        && check.port == policy.port
}

/// Immutable target state for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredSpec {
    pub name: String,
    /// `name` was derived from the Service uid, so a load balancer carrying it
    /// can only belong to this Service
    pub adoptable: bool,
    pub datacenter_id: String,
    pub private_network_id: Option<String>,
    pub balancing_algorithm: String,
    /// In Service port order
    pub listeners: Vec<ListenerMapping>,
    /// `None` when health checks are disabled
    pub health_check: Option<HealthCheckRequest>,
    /// Cloud server ids, de-duplicated, in node order
    pub targets: Vec<String>,
}

impl DesiredSpec {
    /// Build the desired state of `service` balancing over `targets`.
    pub fn from_service(
        service: &Service,
        targets: Vec<String>,
        cluster: &ClusterInfo,
    ) -> Result<Self, ReconcileError> {
        let annotations = service.metadata.annotations.clone().unwrap_or_default();

        Ok(Self {
            name: load_balancer_name(service)?,
            adoptable: !annotations.contains_key(ANNOTATION_NAME),
            datacenter_id: cluster.datacenter_id.clone(),
            private_network_id: Some(cluster.private_network_id.clone()),
            balancing_algorithm: annotations
                .get(ANNOTATION_BALANCING_ALGORITHM)
                .cloned()
                .unwrap_or_else(|| DEFAULT_BALANCING_ALGORITHM.to_string()),
            listeners: listeners(service)?,
            health_check: health_check_policy(&annotations)?,
            targets: dedup(targets),
        })
    }

    /// Request creating a load balancer that already matches this state
    pub fn create_request(&self) -> LoadBalancerCreateRequest {
        LoadBalancerCreateRequest {
            name: self.name.clone(),
            datacenter_id: self.datacenter_id.clone(),
            create_public_ip_address: true,
            private_network_ids: self.private_network_id.iter().cloned().collect(),
            balancing_algorithm: self.balancing_algorithm.clone(),
            forwarding_rules: self.listeners.iter().map(ListenerMapping::request).collect(),
            health_checks: self.health_check.iter().cloned().collect(),
            backend_nodes: self
                .targets
                .iter()
                .map(|id| BackendNodeCreateRequest { cloud_server_id: id.clone() })
                .collect(),
        }
    }
}

/// Stored load balancer id, empty when the Service has none yet
pub fn load_balancer_id(service: &Service) -> String {
    service
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_ID))
        .cloned()
        .unwrap_or_default()
}

/// Name annotation, or "a" followed by the dash-less uid, at most 32 characters
pub fn load_balancer_name(service: &Service) -> Result<String, ReconcileError> {
    if let Some(name) = service
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(ANNOTATION_NAME))
    {
        return Ok(name.clone());
    }

    let uid = service
        .metadata
        .uid
        .as_deref()
        .ok_or_else(|| ReconcileError::Validation("service has no uid to derive a name from".to_string()))?;
    let mut name = format!("a{}", uid.replace('-', ""));
    name.truncate(32);
    Ok(name)
}

fn listeners(service: &Service) -> Result<Vec<ListenerMapping>, ReconcileError> {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .filter(|ports| !ports.is_empty())
        .ok_or_else(|| ReconcileError::Validation("service has no ports".to_string()))?;

    let mut seen = BTreeSet::new();
    let mut listeners = Vec::with_capacity(ports.len());
    for port in ports {
        let external_port = u16::try_from(port.port)
            .map_err(|_| ReconcileError::Validation(format!("port {} is out of range", port.port)))?;
        if !seen.insert(external_port) {
            return Err(ReconcileError::Validation(format!("port {} is listed twice", external_port)));
        }

        let node_port = port.node_port.ok_or_else(|| {
            ReconcileError::Validation(format!("port {} has no nodePort allocated", external_port))
        })?;
        let internal_port = u16::try_from(node_port)
            .map_err(|_| ReconcileError::Validation(format!("nodePort {} is out of range", node_port)))?;

        let protocol = port.protocol.as_deref().unwrap_or("TCP").to_lowercase();
        listeners.push(ListenerMapping {
            external_protocol: protocol.clone(),
            external_port,
            internal_protocol: protocol,
            internal_port,
        });
    }
    Ok(listeners)
}

/// Health check policy, or `None` when the enable flag is absent, false or unparsable
fn health_check_policy(annotations: &BTreeMap<String, String>) -> Result<Option<HealthCheckRequest>, ReconcileError> {
    let enabled = annotations
        .get(ANNOTATION_HEALTHCHECK_ENABLED)
        .and_then(|v| parse_bool(v))
        .unwrap_or(false);
    if !enabled {
        return Ok(None);
    }

    let mut policy = HealthCheckRequest::default();
    if let Some(v) = annotations.get(ANNOTATION_HEALTHCHECK_TYPE) {
        policy.check_type = v.clone();
    }
    if let Some(v) = annotations.get(ANNOTATION_HEALTHCHECK_URL) {
        policy.url = v.clone();
    }
    parse_field(annotations, ANNOTATION_HEALTHCHECK_INTERVAL, "interval", &mut policy.interval)?;
    parse_field(annotations, ANNOTATION_HEALTHCHECK_TIMEOUT, "timeout", &mut policy.timeout)?;
    parse_field(
        annotations,
        ANNOTATION_HEALTHCHECK_UNHEALTHY_THRESHOLD,
        "unhealthy threshold",
        &mut policy.unhealthy_threshold,
    )?;
    parse_field(
        annotations,
        ANNOTATION_HEALTHCHECK_HEALTHY_THRESHOLD,
        "healthy threshold",
        &mut policy.healthy_threshold,
    )?;
    parse_field(annotations, ANNOTATION_HEALTHCHECK_PORT, "port", &mut policy.port)?;
    Ok(Some(policy))
}

fn parse_field<T>(
    annotations: &BTreeMap<String, String>,
    key: &str,
    label: &str,
    field: &mut T,
) -> Result<(), ReconcileError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = annotations.get(key) {
        *field = raw
            .trim()
            .parse()
            .map_err(|e| ReconcileError::Validation(format!("Invalid health check {}: {} ({})", label, raw, e)))?;
    }
    Ok(())
}

/// Boolean spellings accepted in annotations
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn dedup(targets: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    targets
        .into_iter()
        .filter(|target| seen.insert(target.clone()))
        .collect()
}
