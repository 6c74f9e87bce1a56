//! Remote Cluster Gateway
//!
//! The subset of the Linode Kubernetes Engine API the operator needs,
//! expressed as a trait so the reconciliation engine can be driven by any
//! transport (or by mocks in tests). Every call distinguishes "not found"
//! from other failures via [`GatewayError`].

mod types;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::crd::LkeClusterConfig;
use crate::Error;

pub use types::{
    ClusterCreateOptions, ClusterUpdateOptions, ControlPlane, ControlPlaneOptions, Kubeconfig,
    LkeCluster, LkeVersion, NodePool, NodePoolAutoscaler, NodePoolCreateOptions, NodePoolNode,
    NodePoolUpdateOptions, READY_STATUS,
};

/// Classified failure of a remote call
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// The remote resource does not exist
    #[error("resource not found")]
    NotFound,

    /// The remote resource exists but is not available yet
    #[error("resource not available yet")]
    NotAvailable,

    /// The provider rejected the request
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error message
        message: String,
    },

    /// The request never reached the provider
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Classify a provider HTTP response
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            404 => Self::NotFound,
            503 => Self::NotAvailable,
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }
}

/// Operations against the managed-Kubernetes provider
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LkeGateway: Send + Sync {
    /// List Kubernetes versions the provider can create clusters with
    async fn list_versions(&self) -> Result<Vec<LkeVersion>, GatewayError>;

    /// Fetch a cluster by ID
    async fn get_cluster(&self, cluster_id: i64) -> Result<LkeCluster, GatewayError>;

    /// Create a cluster
    async fn create_cluster(&self, opts: ClusterCreateOptions)
        -> Result<LkeCluster, GatewayError>;

    /// Update tags and control plane settings of a cluster
    async fn update_cluster(
        &self,
        cluster_id: i64,
        opts: ClusterUpdateOptions,
    ) -> Result<LkeCluster, GatewayError>;

    /// Delete a cluster
    async fn delete_cluster(&self, cluster_id: i64) -> Result<(), GatewayError>;

    /// Fetch the cluster kubeconfig; `NotAvailable` while provisioning
    async fn get_kubeconfig(&self, cluster_id: i64) -> Result<Kubeconfig, GatewayError>;

    /// List node pools of a cluster, including member nodes
    async fn list_node_pools(&self, cluster_id: i64) -> Result<Vec<NodePool>, GatewayError>;

    /// Add a node pool to a cluster
    async fn create_node_pool(
        &self,
        cluster_id: i64,
        opts: NodePoolCreateOptions,
    ) -> Result<NodePool, GatewayError>;

    /// Update a node pool in place
    async fn update_node_pool(
        &self,
        cluster_id: i64,
        pool_id: i64,
        opts: NodePoolUpdateOptions,
    ) -> Result<NodePool, GatewayError>;

    /// Delete a node pool
    async fn delete_node_pool(&self, cluster_id: i64, pool_id: i64) -> Result<(), GatewayError>;
}

/// Produces a gateway authorised for one LKEClusterConfig
///
/// Resolving `spec.tokenSecretRef` into a credential is the factory's job.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GatewayFactory: Send + Sync {
    /// Build a gateway for the given resource
    async fn connect(&self, cluster: &LkeClusterConfig) -> Result<Arc<dyn LkeGateway>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(GatewayError::from_status(404, "gone"), GatewayError::NotFound);
        assert_eq!(
            GatewayError::from_status(503, "busy"),
            GatewayError::NotAvailable
        );
        assert_eq!(
            GatewayError::from_status(401, "bad token"),
            GatewayError::Api {
                status: 401,
                message: "bad token".to_string()
            }
        );
    }
}
