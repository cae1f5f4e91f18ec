//! Persists a newly created load balancer id onto the owning object.

use crate::desired::ANNOTATION_ID;
use crate::error::BindError;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use std::fmt;
use tracing::info;

/// Namespace and name of the object a load balancer belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Records which load balancer an object owns.
///
/// Called exactly once per created load balancer, right after creation.
#[async_trait::async_trait]
pub trait IdentityBinder: Send + Sync {
    async fn bind(&self, object: &ObjectKey, load_balancer_id: &str) -> Result<(), BindError>;
}

/// Stores the id in the Service's `ah-loadbalancer-id` annotation
#[derive(Clone)]
pub struct ServiceAnnotationBinder {
    client: Client,
}

impl ServiceAnnotationBinder {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Merge patch setting the id annotation, guarded by `resource_version`
pub fn annotation_patch(resource_version: Option<&str>, load_balancer_id: &str) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": resource_version,
            "annotations": {
                ANNOTATION_ID: load_balancer_id,
            }
        }
    })
}

#[async_trait::async_trait]
impl IdentityBinder for ServiceAnnotationBinder {
    async fn bind(&self, object: &ObjectKey, load_balancer_id: &str) -> Result<(), BindError> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), &object.namespace);

        // Patch against the version just read so a concurrent edit surfaces as a 409
        let current = api.get(&object.name).await?;
        let resource_version = current.metadata.resource_version.as_deref();
        if resource_version.is_none() {
            return Err(BindError::Rejected(format!("{} has no resourceVersion", object)));
        }

        let patch = annotation_patch(resource_version, load_balancer_id);
        api.patch(&object.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        info!("Bound load balancer {} to Service {}", load_balancer_id, object);
        Ok(())
    }
}
