//! Wire types exchanged with the Linode Kubernetes Engine API
//!
//! Field names follow the provider's JSON so transport adapters can
//! (de)serialize them directly.

use serde::{Deserialize, Serialize};

/// Status value the provider reports for ready clusters and nodes
pub const READY_STATUS: &str = "ready";

/// A Kubernetes version offered by the provider (e.g. "1.30")
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LkeVersion {
    /// Version identifier in `major.minor` form
    pub id: String,
}

/// Control plane settings of a remote cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ControlPlane {
    /// Whether the control plane is highly available
    pub high_availability: bool,
}

/// A remote LKE cluster
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LkeCluster {
    /// Remote cluster ID
    pub id: i64,
    /// Display label
    pub label: String,
    /// Region the cluster runs in
    pub region: String,
    /// Kubernetes version in `major.minor` form
    pub k8s_version: String,
    /// Provider status ("ready", "not_ready")
    pub status: String,
    /// Tags on the cluster
    #[serde(default)]
    pub tags: Vec<String>,
    /// Control plane settings
    #[serde(default)]
    pub control_plane: ControlPlane,
}

/// Autoscaler settings of a remote node pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodePoolAutoscaler {
    /// Whether autoscaling is enabled
    pub enabled: bool,
    /// Minimum node count
    pub min: u32,
    /// Maximum node count
    pub max: u32,
}

/// A single node (Linode instance) in a remote node pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodePoolNode {
    /// Node ID
    pub id: String,
    /// Backing Linode instance ID
    #[serde(default)]
    pub instance_id: Option<i64>,
    /// Provider status ("ready", "not_ready")
    pub status: String,
}

/// A remote node pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodePool {
    /// Remote node pool ID
    pub id: i64,
    /// Number of nodes
    pub count: u32,
    /// Linode instance type
    #[serde(rename = "type")]
    pub node_type: String,
    /// Tags on the pool; one of them carries the logical name
    #[serde(default)]
    pub tags: Vec<String>,
    /// Autoscaler settings
    #[serde(default)]
    pub autoscaler: NodePoolAutoscaler,
    /// Member nodes
    #[serde(default, rename = "nodes")]
    pub linodes: Vec<NodePoolNode>,
}

/// Base64-encoded kubeconfig as returned by the provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Kubeconfig {
    /// Base64 kubeconfig document
    pub kubeconfig: String,
}

/// Control plane options for create and update requests
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ControlPlaneOptions {
    /// Requested HA flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<bool>,
}

/// Node pool descriptor used when creating a cluster or a pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodePoolCreateOptions {
    /// Number of nodes
    pub count: u32,
    /// Linode instance type
    #[serde(rename = "type")]
    pub node_type: String,
    /// Tags on the pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Autoscaler settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaler: Option<NodePoolAutoscaler>,
}

/// Node pool update request
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct NodePoolUpdateOptions {
    /// Number of nodes
    pub count: u32,
    /// Tags on the pool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Autoscaler settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaler: Option<NodePoolAutoscaler>,
}

/// Cluster create request
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterCreateOptions {
    /// Display label
    pub label: String,
    /// Region
    pub region: String,
    /// Kubernetes version in `major.minor` form
    pub k8s_version: String,
    /// Initial node pools
    pub node_pools: Vec<NodePoolCreateOptions>,
    /// Tags on the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Control plane settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlaneOptions>,
}

/// Cluster update request
///
/// `None` fields are left untouched by the provider.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClusterUpdateOptions {
    /// Tags to replace the current set with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Control plane settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<ControlPlaneOptions>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_pool_parses_provider_json() {
        let json = r#"{
            "id": 456,
            "count": 3,
            "type": "g6-standard-1",
            "tags": ["key=workers"],
            "autoscaler": {"enabled": true, "min": 3, "max": 6},
            "nodes": [{"id": "456-abc", "instance_id": 789, "status": "ready"}]
        }"#;
        let pool: NodePool = serde_json::from_str(json).unwrap();
        assert_eq!(pool.id, 456);
        assert_eq!(pool.node_type, "g6-standard-1");
        assert!(pool.autoscaler.enabled);
        assert_eq!(pool.linodes.len(), 1);
        assert_eq!(pool.linodes[0].status, READY_STATUS);
    }

    #[test]
    fn empty_update_serializes_to_empty_object() {
        let opts = ClusterUpdateOptions::default();
        assert_eq!(serde_json::to_string(&opts).unwrap(), "{}");
    }
}
