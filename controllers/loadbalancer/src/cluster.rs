//! Cluster placement resolved once at startup.
//!
//! New load balancers are created in the cluster's datacenter and attached to
//! its private network. Both are configured by human-friendly handles (slug,
//! network number) and resolved to API ids here.

use crate::error::ControllerError;
use ah_client::{AhError, LoadBalancersApi};
use tracing::info;

/// Datacenter and private network every load balancer is placed in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub datacenter_id: String,
    pub private_network_id: String,
}

impl ClusterInfo {
    /// Resolve `datacenter_slug` and `private_network_number` to ids.
    pub async fn resolve(
        api: &dyn LoadBalancersApi,
        datacenter_slug: &str,
        private_network_number: &str,
    ) -> Result<Self, ControllerError> {
        let private_network_id = private_network_id_by_number(api, private_network_number).await?;
        let datacenter_id = datacenter_id_by_slug(api, datacenter_slug).await?;

        info!(
            "Cluster placement: datacenter {} ({}), private network {} ({})",
            datacenter_slug, datacenter_id, private_network_number, private_network_id
        );
        Ok(Self {
            datacenter_id,
            private_network_id,
        })
    }
}

async fn private_network_id_by_number(api: &dyn LoadBalancersApi, number: &str) -> Result<String, ControllerError> {
    let mut networks = api.list_private_networks(&[("number", number)]).await?;
    if networks.len() != 1 {
        return Err(ControllerError::Ah(AhError::NotFound(format!(
            "expected exactly one private network numbered {}, found {}",
            number,
            networks.len()
        ))));
    }
    Ok(networks.remove(0).id)
}

async fn datacenter_id_by_slug(api: &dyn LoadBalancersApi, slug: &str) -> Result<String, ControllerError> {
    api.list_datacenters()
        .await?
        .into_iter()
        .find(|dc| dc.slug == slug)
        .map(|dc| dc.id)
        .ok_or_else(|| ControllerError::Ah(AhError::NotFound(format!("datacenter {}", slug))))
}
