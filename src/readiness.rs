//! Readiness probing of a remote cluster
//!
//! A cluster is ready when the provider reports it ready and every node of
//! every pool is ready as well.

use tracing::debug;

use crate::gateway::{LkeGateway, READY_STATUS};
use crate::Error;

/// Probe whether the remote cluster and all of its nodes are ready
///
/// A not-ready answer is `Ok(false)`; only failed calls are errors.
pub async fn is_ready(gateway: &dyn LkeGateway, cluster_id: i64) -> Result<bool, Error> {
    let cluster = gateway
        .get_cluster(cluster_id)
        .await
        .map_err(|e| Error::gateway("get cluster", e))?;

    if cluster.status != READY_STATUS {
        debug!(cluster_id, status = %cluster.status, "cluster not ready");
        return Ok(false);
    }

    let pools = gateway
        .list_node_pools(cluster_id)
        .await
        .map_err(|e| Error::gateway("list node pools", e))?;

    for pool in &pools {
        if let Some(node) = pool.linodes.iter().find(|n| n.status != READY_STATUS) {
            debug!(
                cluster_id,
                pool_id = pool.id,
                node = %node.id,
                status = %node.status,
                "node not ready"
            );
            return Ok(false);
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, LkeCluster, MockLkeGateway, NodePool, NodePoolNode};

    fn cluster(status: &str) -> LkeCluster {
        LkeCluster {
            id: 1,
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn pool(statuses: &[&str]) -> NodePool {
        NodePool {
            id: 10,
            linodes: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| NodePoolNode {
                    id: format!("10-{i}"),
                    instance_id: None,
                    status: s.to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn ready_cluster_with_ready_nodes() {
        let mut gateway = MockLkeGateway::new();
        gateway
            .expect_get_cluster()
            .returning(|_| Ok(cluster("ready")));
        gateway
            .expect_list_node_pools()
            .returning(|_| Ok(vec![pool(&["ready", "ready"]), pool(&["ready"])]));

        assert!(is_ready(&gateway, 1).await.unwrap());
    }

    #[tokio::test]
    async fn cluster_not_ready_skips_node_listing() {
        let mut gateway = MockLkeGateway::new();
        gateway
            .expect_get_cluster()
            .returning(|_| Ok(cluster("not_ready")));
        gateway.expect_list_node_pools().never();

        assert!(!is_ready(&gateway, 1).await.unwrap());
    }

    #[tokio::test]
    async fn one_provisioning_node_means_not_ready() {
        let mut gateway = MockLkeGateway::new();
        gateway
            .expect_get_cluster()
            .returning(|_| Ok(cluster("ready")));
        gateway
            .expect_list_node_pools()
            .returning(|_| Ok(vec![pool(&["ready"]), pool(&["ready", "provisioning"])]));

        assert!(!is_ready(&gateway, 1).await.unwrap());
    }

    #[tokio::test]
    async fn lookup_failures_are_errors() {
        let mut gateway = MockLkeGateway::new();
        gateway
            .expect_get_cluster()
            .returning(|_| Err(GatewayError::Transport("reset".to_string())));

        assert!(is_ready(&gateway, 1).await.is_err());
    }
}
