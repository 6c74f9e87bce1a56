//! Shared types for the LKEClusterConfig CRD

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference to the Kubernetes secret holding the Linode API token
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SecretRef {
    /// Namespace of the secret
    pub namespace: String,
    /// Name of the secret
    pub name: String,
}

/// Node count used when a pool omits `nodeCount`
pub const DEFAULT_NODE_COUNT: u32 = 3;

/// Instance type used when a pool omits `linodeType`
pub const DEFAULT_LINODE_TYPE: &str = "g6-standard-1";

/// Largest autoscaler bound accepted for a pool
pub const AUTOSCALER_MAX_NODES: u32 = 100;

/// Smallest accepted autoscaler `max`
pub const AUTOSCALER_MIN_MAX: u32 = 3;

/// A pool of worker nodes sharing an instance type
///
/// Equality is structural: two pools are equal iff node count, instance type
/// and autoscaler (including its presence) are equal.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LkeNodePool {
    /// Number of nodes in the pool (default: 3)
    #[serde(default = "default_node_count")]
    pub node_count: u32,

    /// Linode instance type for the nodes (default: g6-standard-1)
    #[serde(default = "default_linode_type")]
    pub linode_type: String,

    /// Optional autoscaler bounds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autoscaler: Option<LkeNodePoolAutoscaler>,
}

fn default_node_count() -> u32 {
    DEFAULT_NODE_COUNT
}

fn default_linode_type() -> String {
    DEFAULT_LINODE_TYPE.to_string()
}

impl LkeNodePool {
    /// Validate a single node pool under the given logical name
    pub fn validate(&self, name: &str) -> Result<(), crate::Error> {
        if self.linode_type.trim().is_empty() {
            return Err(crate::Error::validation(format!(
                "node pool '{name}' must set linodeType"
            )));
        }

        if let Some(ref autoscaler) = self.autoscaler {
            if autoscaler.min > AUTOSCALER_MAX_NODES {
                return Err(crate::Error::validation(format!(
                    "node pool '{name}' autoscaler min ({}) must be at most {AUTOSCALER_MAX_NODES}",
                    autoscaler.min
                )));
            }
            if !(AUTOSCALER_MIN_MAX..=AUTOSCALER_MAX_NODES).contains(&autoscaler.max) {
                return Err(crate::Error::validation(format!(
                    "node pool '{name}' autoscaler max ({}) must be between {AUTOSCALER_MIN_MAX} and {AUTOSCALER_MAX_NODES}",
                    autoscaler.max
                )));
            }
            if autoscaler.min > autoscaler.max {
                return Err(crate::Error::validation(format!(
                    "node pool '{name}' autoscaler min ({}) exceeds max ({})",
                    autoscaler.min, autoscaler.max
                )));
            }
        }

        Ok(())
    }
}

/// Autoscaler bounds for a node pool
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct LkeNodePoolAutoscaler {
    /// Minimum number of nodes (0-100)
    #[schemars(range(min = 0, max = 100))]
    pub min: u32,
    /// Maximum number of nodes (3-100)
    #[schemars(range(min = 3, max = 100))]
    pub max: u32,
}

/// Observed state of one logical node pool
///
/// An absent `id` means the pool is desired but not yet created remotely.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct NodePoolStatus {
    /// Remote node pool ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Pool shape as last observed
    pub details: LkeNodePool,
}

impl NodePoolStatus {
    /// Status for a pool that does not exist remotely yet
    pub fn pending(details: LkeNodePool) -> Self {
        Self { id: None, details }
    }

    /// Status for a pool known by its remote ID
    pub fn created(id: i64, details: LkeNodePool) -> Self {
        Self {
            id: Some(id),
            details,
        }
    }
}

/// Advisory lifecycle phase of an LKE cluster
///
/// Phase is reported to the resource owner; the engine never branches on it.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has been created remotely yet
    #[default]
    Unknown,
    /// The remote cluster was created and is being provisioned
    Provisioning,
    /// A change is being applied to the remote cluster
    Updating,
    /// The remote cluster matches the desired state and is ready
    Active,
    /// The remote cluster is being deleted
    Deleting,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Provisioning => write!(f, "Provisioning"),
            Self::Updating => write!(f, "Updating"),
            Self::Active => write!(f, "Active"),
            Self::Deleting => write!(f, "Deleting"),
        }
    }
}
