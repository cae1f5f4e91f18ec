//! Node to cloud server translation.

use crate::error::ReconcileError;
use k8s_openapi::api::core::v1::Node;

/// Scheme of `spec.providerID` on Advanced Hosting nodes
pub const PROVIDER_PREFIX: &str = "advancedhosting://";

/// Nodes carrying this label never receive load balancer traffic
pub const EXCLUDE_LABEL: &str = "node.kubernetes.io/exclude-from-external-load-balancers";

/// Cloud server id from an `advancedhosting://<id>` provider ID
pub fn instance_id(provider_id: &str) -> Result<&str, ReconcileError> {
    if provider_id.is_empty() {
        return Err(ReconcileError::Validation("Empty ProviderID".to_string()));
    }
    provider_id
        .strip_prefix(PROVIDER_PREFIX)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReconcileError::Validation(format!("Invalid ProviderID: {}", provider_id)))
}

/// Whether `node` should be a backend
pub fn is_backend_candidate(node: &Node) -> bool {
    if node.metadata.deletion_timestamp.is_some() {
        return false;
    }
    !node
        .metadata
        .labels
        .as_ref()
        .is_some_and(|labels| labels.contains_key(EXCLUDE_LABEL))
}

/// Cloud server ids of the backend candidates among `nodes`, in node order.
///
/// A candidate without a valid provider ID fails the whole translation.
pub fn backend_targets(nodes: &[Node]) -> Result<Vec<String>, ReconcileError> {
    nodes
        .iter()
        .filter(|node| is_backend_candidate(node))
        .map(|node| {
            let provider_id = node
                .spec
                .as_ref()
                .and_then(|spec| spec.provider_id.as_deref())
                .unwrap_or_default();
            instance_id(provider_id).map(str::to_string).map_err(|e| match e {
                ReconcileError::Validation(msg) => ReconcileError::Validation(format!(
                    "node {}: {}",
                    node.metadata.name.as_deref().unwrap_or("<unnamed>"),
                    msg
                )),
                other => other,
            })
        })
        .collect()
}
