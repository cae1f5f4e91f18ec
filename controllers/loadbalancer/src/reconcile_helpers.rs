//! Helper functions for the Service reconciliation loop
//!
//! Everything here is pure: filters deciding which Services this controller
//! owns, and the JSON merge patches it sends back to Kubernetes.

use crate::binder::ObjectKey;
use crate::error::ControllerError;
use crate::reconciler::lifecycle::LoadBalancerStatus;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, Service};
use std::net::IpAddr;

/// Finalizer guarding remote cleanup of a Service's load balancer
pub const FINALIZER: &str = "service.kubernetes.io/load-balancer-cleanup";

const SERVICE_TYPE_LOAD_BALANCER: &str = "LoadBalancer";

/// Namespace and name of `service`
pub fn service_key(service: &Service) -> Result<ObjectKey, ControllerError> {
    let name = service
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ControllerError::InvalidConfig("Service missing name".to_string()))?;
    let namespace = service.metadata.namespace.as_deref().unwrap_or("default");
    Ok(ObjectKey::new(namespace, name))
}

/// Whether this controller should provision a load balancer for `service`.
///
/// Services that name a `loadBalancerClass` belong to another implementation.
pub fn wants_load_balancer(service: &Service) -> bool {
    service.spec.as_ref().is_some_and(|spec| {
        spec.type_.as_deref() == Some(SERVICE_TYPE_LOAD_BALANCER) && spec.load_balancer_class.is_none()
    })
}

pub fn has_finalizer(service: &Service) -> bool {
    service
        .metadata
        .finalizers
        .as_ref()
        .is_some_and(|finalizers| finalizers.iter().any(|f| f == FINALIZER))
}

pub fn is_being_deleted(service: &Service) -> bool {
    service.metadata.deletion_timestamp.is_some()
}

/// Whether the load balancer of `service` has to be torn down now
pub fn needs_cleanup(service: &Service) -> bool {
    has_finalizer(service) && (is_being_deleted(service) || !wants_load_balancer(service))
}

/// Merge patch appending [`FINALIZER`]; the list is replaced as a whole,
/// so the patch is guarded by the resourceVersion it was computed from.
pub fn add_finalizer_patch(service: &Service) -> serde_json::Value {
    let mut finalizers = service.metadata.finalizers.clone().unwrap_or_default();
    if !finalizers.iter().any(|f| f == FINALIZER) {
        finalizers.push(FINALIZER.to_string());
    }
    finalizers_patch(service, finalizers)
}

/// Merge patch dropping [`FINALIZER`]
pub fn remove_finalizer_patch(service: &Service) -> serde_json::Value {
    let finalizers = service
        .metadata
        .finalizers
        .iter()
        .flatten()
        .filter(|f| *f != FINALIZER)
        .cloned()
        .collect();
    finalizers_patch(service, finalizers)
}

fn finalizers_patch(service: &Service, finalizers: Vec<String>) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": service.metadata.resource_version,
            "finalizers": finalizers,
        }
    })
}

/// Ingress entries for `status`: IP literals as `ip`, anything else as `hostname`
pub fn ingress_entries(status: &LoadBalancerStatus) -> Vec<LoadBalancerIngress> {
    status
        .ingress
        .iter()
        .map(|address| {
            if address.parse::<IpAddr>().is_ok() {
                LoadBalancerIngress {
                    ip: Some(address.clone()),
                    ..Default::default()
                }
            } else {
                LoadBalancerIngress {
                    hostname: Some(address.clone()),
                    ..Default::default()
                }
            }
        })
        .collect()
}

/// Ingress currently published on `service`
pub fn current_ingress(service: &Service) -> Vec<LoadBalancerIngress> {
    service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.clone())
        .unwrap_or_default()
}

/// Whether publishing `status` would change the Service
pub fn ingress_needs_update(service: &Service, status: &LoadBalancerStatus) -> bool {
    current_ingress(service) != ingress_entries(status)
}

/// Status merge patch publishing `status` (an empty list clears it)
pub fn ingress_status_patch(status: &LoadBalancerStatus) -> serde_json::Value {
    serde_json::json!({
        "status": {
            "loadBalancer": {
                "ingress": ingress_entries(status),
            }
        }
    })
}
