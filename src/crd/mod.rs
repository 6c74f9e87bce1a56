//! Custom Resource Definitions for the LKE operator

mod cluster;
mod types;

pub use cluster::{LkeClusterConfig, LkeClusterConfigSpec, LkeClusterConfigStatus, LATEST_VERSION};
pub use types::{LkeNodePool, LkeNodePoolAutoscaler, NodePoolStatus, Phase, SecretRef};
