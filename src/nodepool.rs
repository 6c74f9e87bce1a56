//! Node pool diffing and the logical-name tag contract
//!
//! The provider has no notion of a pool's logical name, so every pool the
//! operator creates carries exactly one tag `key=<logicalName>`. Statuses are
//! rebuilt from the provider by decoding that tag; pools without it are keyed
//! `unknown-<remoteID>`.
//!
//! Diffs are applied in a fixed order (create, then update-or-create for
//! changed pools, then delete) so capacity is added before it is removed.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::crd::{LkeNodePool, LkeNodePoolAutoscaler, NodePoolStatus};
use crate::gateway::{
    GatewayError, LkeGateway, NodePool, NodePoolAutoscaler, NodePoolCreateOptions,
    NodePoolUpdateOptions,
};
use crate::Error;

/// Tag key carrying a pool's logical name
pub const NODE_POOL_TAG_KEY: &str = "key";

/// Key prefix for remote pools whose logical name cannot be decoded
pub const UNKNOWN_POOL_PREFIX: &str = "unknown-";

/// Tag identifying a pool by logical name
pub fn node_pool_tag(name: &str) -> String {
    format!("{NODE_POOL_TAG_KEY}={name}")
}

/// Logical name of a remote pool, from the first `key=` tag
pub fn decode_pool_name(pool: &NodePool) -> String {
    let prefix = format!("{NODE_POOL_TAG_KEY}=");
    pool.tags
        .iter()
        .find_map(|tag| tag.strip_prefix(prefix.as_str()))
        .filter(|name| !name.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("{UNKNOWN_POOL_PREFIX}{}", pool.id))
}

/// Pool shape as reported by the provider
pub fn spec_from_remote(pool: &NodePool) -> LkeNodePool {
    LkeNodePool {
        node_count: pool.count,
        linode_type: pool.node_type.clone(),
        autoscaler: pool.autoscaler.enabled.then_some(LkeNodePoolAutoscaler {
            min: pool.autoscaler.min,
            max: pool.autoscaler.max,
        }),
    }
}

/// Desired statuses, none of which has a remote ID yet
pub fn statuses_from_spec(
    pools: &BTreeMap<String, LkeNodePool>,
) -> BTreeMap<String, NodePoolStatus> {
    pools
        .iter()
        .map(|(name, pool)| (name.clone(), NodePoolStatus::pending(pool.clone())))
        .collect()
}

/// Observed statuses rebuilt from the provider's pool list
///
/// When several pools decode to the same name, the newest (highest ID) keeps
/// it: a replacement pool is always created after the pool it supersedes. The
/// others are keyed as unknown so they are scheduled for deletion rather than
/// silently shadowed.
pub fn statuses_from_remote(pools: &[NodePool]) -> BTreeMap<String, NodePoolStatus> {
    let mut owners: BTreeMap<String, i64> = BTreeMap::new();
    for pool in pools {
        owners
            .entry(decode_pool_name(pool))
            .and_modify(|id| *id = (*id).max(pool.id))
            .or_insert(pool.id);
    }

    let mut statuses = BTreeMap::new();
    for pool in pools {
        let mut name = decode_pool_name(pool);
        if owners.get(&name) != Some(&pool.id) {
            debug!(pool = %name, pool_id = pool.id, "duplicate logical pool name");
            name = format!("{UNKNOWN_POOL_PREFIX}{}", pool.id);
        }
        statuses.insert(name, NodePoolStatus::created(pool.id, spec_from_remote(pool)));
    }
    statuses
}

/// Create descriptors for every desired pool, each tagged with its name
pub fn make_node_pools(pools: &BTreeMap<String, LkeNodePool>) -> Vec<NodePoolCreateOptions> {
    pools
        .iter()
        .map(|(name, pool)| create_options(name, pool))
        .collect()
}

/// Create descriptor for one pool
pub fn create_options(name: &str, pool: &LkeNodePool) -> NodePoolCreateOptions {
    NodePoolCreateOptions {
        count: pool.node_count,
        node_type: pool.linode_type.clone(),
        tags: vec![node_pool_tag(name)],
        autoscaler: pool.autoscaler.as_ref().map(|a| NodePoolAutoscaler {
            enabled: true,
            min: a.min,
            max: a.max,
        }),
    }
}

/// Update descriptor for one pool
///
/// The autoscaler is always sent so removing it from the spec disables it.
pub fn update_options(name: &str, pool: &LkeNodePool) -> NodePoolUpdateOptions {
    let autoscaler = match pool.autoscaler {
        Some(ref a) => NodePoolAutoscaler {
            enabled: true,
            min: a.min,
            max: a.max,
        },
        None => NodePoolAutoscaler {
            enabled: false,
            min: pool.node_count,
            max: pool.node_count,
        },
    };

    NodePoolUpdateOptions {
        count: pool.node_count,
        tags: Some(vec![node_pool_tag(name)]),
        autoscaler: Some(autoscaler),
    }
}

/// Outcome of comparing desired against observed pools
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePoolDiff {
    /// Pools missing remotely
    pub create: BTreeMap<String, NodePoolStatus>,
    /// Pools whose shape changed; updated in place when an ID is known,
    /// created otherwise
    pub update: BTreeMap<String, NodePoolStatus>,
    /// Pools no longer desired
    pub delete: BTreeMap<String, NodePoolStatus>,
    /// Remote pools superseded by a replacement in `update` (instance type
    /// changes cannot be applied in place)
    pub replace: BTreeMap<String, i64>,
}

impl NodePoolDiff {
    /// True when nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Partition pools into create, update and delete sets
///
/// Keys present on both sides with equal shapes appear in none of the sets.
pub fn diff(
    desired: &BTreeMap<String, NodePoolStatus>,
    observed: &BTreeMap<String, NodePoolStatus>,
) -> NodePoolDiff {
    let mut result = NodePoolDiff::default();

    for (name, want) in desired {
        match observed.get(name) {
            None => {
                result.create.insert(name.clone(), want.clone());
            }
            Some(have) if have.details != want.details => {
                let changed = match have.id {
                    Some(id) if have.details.linode_type != want.details.linode_type => {
                        result.replace.insert(name.clone(), id);
                        NodePoolStatus::pending(want.details.clone())
                    }
                    id => NodePoolStatus {
                        id,
                        details: want.details.clone(),
                    },
                };
                result.update.insert(name.clone(), changed);
            }
            Some(_) => {}
        }
    }

    for (name, have) in observed {
        if !desired.contains_key(name) {
            result.delete.insert(name.clone(), have.clone());
        }
    }

    result
}

/// Apply a diff against the provider
///
/// Deleting a pool that is already gone counts as success.
pub async fn apply_diff(
    gateway: &dyn LkeGateway,
    cluster_id: i64,
    diff: &NodePoolDiff,
) -> Result<(), Error> {
    for (name, status) in &diff.create {
        info!(pool = %name, "creating node pool");
        gateway
            .create_node_pool(cluster_id, create_options(name, &status.details))
            .await
            .map_err(|e| Error::gateway(format!("create node pool {name}"), e))?;
    }

    for (name, status) in &diff.update {
        match status.id {
            Some(pool_id) => {
                info!(pool = %name, pool_id, "updating node pool");
                gateway
                    .update_node_pool(cluster_id, pool_id, update_options(name, &status.details))
                    .await
                    .map_err(|e| Error::gateway(format!("update node pool {name}"), e))?;
            }
            None => {
                info!(pool = %name, "creating node pool that never completed");
                gateway
                    .create_node_pool(cluster_id, create_options(name, &status.details))
                    .await
                    .map_err(|e| Error::gateway(format!("create node pool {name}"), e))?;
            }
        }
    }

    let superseded = diff.replace.iter().map(|(name, id)| (name, Some(*id)));
    let removed = diff.delete.iter().map(|(name, status)| (name, status.id));
    for (name, pool_id) in removed.chain(superseded) {
        let Some(pool_id) = pool_id else {
            debug!(pool = %name, "pool was never created, nothing to delete");
            continue;
        };

        info!(pool = %name, pool_id, "deleting node pool");
        match gateway.delete_node_pool(cluster_id, pool_id).await {
            Ok(()) => {}
            Err(GatewayError::NotFound) => {
                debug!(pool = %name, pool_id, "node pool already gone");
            }
            Err(e) => return Err(Error::gateway(format!("delete node pool {name}"), e)),
        }
    }

    Ok(())
}
