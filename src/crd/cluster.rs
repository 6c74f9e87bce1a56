//! LKEClusterConfig Custom Resource Definition
//!
//! An LKEClusterConfig declares the desired shape of one Linode Kubernetes
//! Engine cluster. The operator records what it created in the status.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{LkeNodePool, NodePoolStatus, Phase, SecretRef};

/// Kubernetes version literal that asks for the newest available version
pub const LATEST_VERSION: &str = "latest";

/// Specification for an LKEClusterConfig
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "lke.anza-labs.dev",
    version = "v1alpha1",
    kind = "LKEClusterConfig",
    root = "LkeClusterConfig",
    plural = "lkeclusterconfigs",
    shortname = "lke",
    status = "LkeClusterConfigStatus",
    namespaced,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Region","type":"string","jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"ClusterID","type":"integer","jsonPath":".status.clusterID"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LkeClusterConfigSpec {
    /// Region where the cluster is provisioned
    pub region: String,

    /// Secret holding the Linode API token
    pub token_secret_ref: SecretRef,

    /// Request a highly-available control plane (defaults to false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_availability: Option<bool>,

    /// Node pools keyed by logical name
    pub node_pools: BTreeMap<String, LkeNodePool>,

    /// Kubernetes version, either an explicit `major.minor` or "latest"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,

    /// Tags applied to the remote cluster
    ///
    /// When unset, the `lke.anza-labs.dev/tags` annotation is consulted instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl LkeClusterConfigSpec {
    /// Desired control-plane HA flag, defaulting to false
    pub fn wants_high_availability(&self) -> bool {
        self.high_availability.unwrap_or(false)
    }

    /// True when the version should be resolved against the provider's list
    pub fn wants_latest_version(&self) -> bool {
        match self.kubernetes_version.as_deref() {
            None => true,
            Some(v) => v.trim().is_empty() || v == LATEST_VERSION,
        }
    }

    /// Validate the cluster specification
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.region.trim().is_empty() {
            return Err(crate::Error::validation("region must not be empty"));
        }

        if self.node_pools.is_empty() {
            return Err(crate::Error::validation(
                "at least one node pool is required",
            ));
        }

        for (name, pool) in &self.node_pools {
            if name.trim().is_empty() {
                return Err(crate::Error::validation(
                    "node pool names must not be empty",
                ));
            }
            pool.validate(name)?;
        }

        Ok(())
    }
}

/// Status for an LKEClusterConfig
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LkeClusterConfigStatus {
    /// Advisory lifecycle phase
    #[serde(default)]
    pub phase: Phase,

    /// ID of the remote cluster; never changes once set
    #[serde(
        default,
        rename = "clusterID",
        skip_serializing_if = "Option::is_none"
    )]
    pub cluster_id: Option<i64>,

    /// Observed node pools keyed by logical name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_pool_statuses: BTreeMap<String, NodePoolStatus>,

    /// Human-readable description of the last failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
}

impl LkeClusterConfigStatus {
    /// Create a new status with the given phase
    pub fn with_phase(phase: Phase) -> Self {
        Self {
            phase,
            ..Default::default()
        }
    }

    /// Set the cluster ID and return self for chaining
    pub fn cluster_id(mut self, id: i64) -> Self {
        self.cluster_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::types::LkeNodePoolAutoscaler;

    fn sample_spec() -> LkeClusterConfigSpec {
        LkeClusterConfigSpec {
            region: "us-east".to_string(),
            token_secret_ref: SecretRef {
                namespace: "default".to_string(),
                name: "linode-token".to_string(),
            },
            high_availability: None,
            node_pools: BTreeMap::from([(
                "workers".to_string(),
                LkeNodePool {
                    node_count: 3,
                    linode_type: "g6-standard-1".to_string(),
                    autoscaler: None,
                },
            )]),
            kubernetes_version: None,
            tags: None,
        }
    }

    // =========================================================================
    // Defaults
    // =========================================================================

    #[test]
    fn ha_defaults_to_false() {
        let mut spec = sample_spec();
        assert!(!spec.wants_high_availability());
        spec.high_availability = Some(true);
        assert!(spec.wants_high_availability());
    }

    #[test]
    fn version_defaults_to_latest() {
        let mut spec = sample_spec();
        assert!(spec.wants_latest_version());

        spec.kubernetes_version = Some("latest".to_string());
        assert!(spec.wants_latest_version());

        spec.kubernetes_version = Some("1.29".to_string());
        assert!(!spec.wants_latest_version());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn sample_spec_is_valid() {
        assert!(sample_spec().validate().is_ok());
    }

    #[test]
    fn empty_region_is_rejected() {
        let mut spec = sample_spec();
        spec.region = String::new();
        assert!(spec.validate().unwrap_err().to_string().contains("region"));
    }

    #[test]
    fn at_least_one_node_pool_is_required() {
        let mut spec = sample_spec();
        spec.node_pools.clear();
        assert!(spec
            .validate()
            .unwrap_err()
            .to_string()
            .contains("at least one node pool"));
    }

    #[test]
    fn invalid_pool_fails_the_spec() {
        let mut spec = sample_spec();
        spec.node_pools.insert(
            "burst".to_string(),
            LkeNodePool {
                node_count: 1,
                linode_type: "g6-standard-2".to_string(),
                autoscaler: Some(LkeNodePoolAutoscaler { min: 4, max: 2 }),
            },
        );
        assert!(spec.validate().unwrap_err().to_string().contains("burst"));
    }

    // =========================================================================
    // Wire format
    // =========================================================================

    #[test]
    fn spec_parses_from_yaml() {
        let yaml = r#"
region: us-east
tokenSecretRef:
  namespace: default
  name: linode-token
highAvailability: true
kubernetesVersion: "1.30"
nodePools:
  workers:
    nodeCount: 3
    linodeType: g6-standard-1
    autoscaler:
      min: 3
      max: 6
tags: [team-a, prod]
"#;
        let spec: LkeClusterConfigSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.region, "us-east");
        assert_eq!(spec.high_availability, Some(true));
        assert_eq!(spec.kubernetes_version.as_deref(), Some("1.30"));
        assert_eq!(spec.node_pools["workers"].node_count, 3);
        assert_eq!(
            spec.node_pools["workers"].autoscaler,
            Some(LkeNodePoolAutoscaler { min: 3, max: 6 })
        );
        assert_eq!(
            spec.tags,
            Some(vec!["team-a".to_string(), "prod".to_string()])
        );
    }

    #[test]
    fn status_uses_cluster_id_wire_name() {
        let status = LkeClusterConfigStatus::with_phase(Phase::Provisioning).cluster_id(1234);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["clusterID"], 1234);
        assert_eq!(json["phase"], "Provisioning");
        assert!(json.get("failureMessage").is_none());
        assert!(json.get("nodePoolStatuses").is_none());
    }

    #[test]
    fn empty_status_defaults_to_unknown() {
        let status: LkeClusterConfigStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status.phase, Phase::Unknown);
        assert!(status.cluster_id.is_none());
    }

    #[test]
    fn crd_is_namespaced_with_expected_names() {
        use kube::CustomResourceExt;

        let crd = LkeClusterConfig::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("lkeclusterconfigs.lke.anza-labs.dev")
        );
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, "LKEClusterConfig");
    }
}
