//! LKE cluster reconciliation engine
//!
//! Drives one LKEClusterConfig towards its desired state against the remote
//! provider. Every decision is re-derived from the remote state and the
//! recorded status on each pass; the phase is reported, never consulted.
//!
//! Each externally visible mutation is followed by a status write, so a pass
//! interrupted at any point resumes from what actually happened.

use std::future::Future;

use kube::ResourceExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cluster::KubeClient;
use crate::crd::{LkeClusterConfig, LkeClusterConfigStatus, Phase};
use crate::gateway::{
    ClusterCreateOptions, ClusterUpdateOptions, ControlPlaneOptions, GatewayError, LkeCluster,
    LkeGateway,
};
use crate::kubeconfig::{sync_kubeconfig, SecretStore};
use crate::{nodepool, readiness, tags, version, Error};

/// What the caller should do after a successful pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The cluster converged; check again only for drift
    Done,
    /// Work is still in flight remotely; check again soon
    Requeue,
}

/// Reconciliation engine for a single pass over one resource
pub struct Engine<'a> {
    gateway: &'a dyn LkeGateway,
    kube: &'a dyn KubeClient,
    secrets: &'a dyn SecretStore,
    cancel: &'a CancellationToken,
}

impl<'a> Engine<'a> {
    /// Create an engine over the given seams
    pub fn new(
        gateway: &'a dyn LkeGateway,
        kube: &'a dyn KubeClient,
        secrets: &'a dyn SecretStore,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            gateway,
            kube,
            secrets,
            cancel,
        }
    }

    /// Converge the remote cluster towards the desired state
    ///
    /// `status` is updated in place and persisted after every remote mutation.
    pub async fn on_change(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
    ) -> Result<ReconcileOutcome, Error> {
        let Some(cluster_id) = status.cluster_id else {
            return self.create(cluster, status).await;
        };

        match self.cancellable(self.gateway.get_cluster(cluster_id)).await? {
            Ok(remote) => self.update(cluster, status, remote).await,
            Err(GatewayError::NotFound) => {
                warn!(cluster_id, "remote cluster disappeared, recreating");
                self.create(cluster, status).await
            }
            Err(e) => Err(Error::gateway("get cluster", e)),
        }
    }

    /// Tear down the remote cluster
    ///
    /// Returns `Done` once the provider no longer knows the cluster.
    pub async fn on_delete(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
    ) -> Result<ReconcileOutcome, Error> {
        let Some(cluster_id) = status.cluster_id else {
            return Err(Error::NoClusterId {
                name: cluster.name_any(),
            });
        };

        if status.phase != Phase::Deleting {
            status.phase = Phase::Deleting;
            self.persist(cluster, status).await?;
        }

        match self.cancellable(self.gateway.get_cluster(cluster_id)).await? {
            Ok(_) => {}
            Err(GatewayError::NotFound) => {
                info!(cluster_id, "remote cluster gone");
                return Ok(ReconcileOutcome::Done);
            }
            Err(e) => return Err(Error::gateway("get cluster", e)),
        }

        match self
            .cancellable(self.gateway.delete_cluster(cluster_id))
            .await?
        {
            Ok(()) => {
                info!(cluster_id, "remote cluster deletion requested");
                Ok(ReconcileOutcome::Requeue)
            }
            Err(GatewayError::NotFound) => Ok(ReconcileOutcome::Done),
            Err(e) => Err(Error::gateway("delete cluster", e)),
        }
    }

    async fn create(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
    ) -> Result<ReconcileOutcome, Error> {
        let spec = &cluster.spec;
        let k8s_version = self
            .cancellable(version::resolve_version(spec, self.gateway))
            .await??;

        let opts = ClusterCreateOptions {
            label: cluster.name_any(),
            region: spec.region.clone(),
            k8s_version,
            node_pools: nodepool::make_node_pools(&spec.node_pools),
            tags: tags::desired_tags(cluster).unwrap_or_default(),
            control_plane: spec.high_availability.map(|ha| ControlPlaneOptions {
                high_availability: Some(ha),
            }),
        };

        info!(
            region = %opts.region,
            version = %opts.k8s_version,
            pools = opts.node_pools.len(),
            "creating LKE cluster"
        );
        let created = self
            .cancellable(self.gateway.create_cluster(opts))
            .await?
            .map_err(|e| Error::gateway("create cluster", e))?;

        status.phase = Phase::Provisioning;
        status.cluster_id = Some(created.id);
        self.persist(cluster, status).await?;
        info!(cluster_id = created.id, "LKE cluster created");

        self.refresh_node_pools(created.id, status).await?;
        self.persist(cluster, status).await?;

        Ok(ReconcileOutcome::Requeue)
    }

    async fn update(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
        remote: LkeCluster,
    ) -> Result<ReconcileOutcome, Error> {
        let cluster_id = remote.id;

        let desired_tags = tags::desired_tags(cluster);
        let staged_tags = tags::diff_tags(desired_tags.as_deref(), &remote.tags);
        let desired_ha = cluster.spec.wants_high_availability();
        let destructive = desired_ha != remote.control_plane.high_availability;

        if staged_tags.is_some() || destructive {
            debug!(
                cluster_id,
                tags_changed = staged_tags.is_some(),
                destructive,
                "cluster settings changed"
            );
            self.set_phase(cluster, status, Phase::Updating).await?;
        }

        let opts = ClusterUpdateOptions {
            tags: staged_tags,
            control_plane: Some(ControlPlaneOptions {
                high_availability: Some(desired_ha),
            }),
        };
        self.cancellable(self.gateway.update_cluster(cluster_id, opts))
            .await?
            .map_err(|e| Error::gateway("update cluster", e))?;

        self.reconcile_node_pools(cluster, status, cluster_id)
            .await?;

        let synced = self
            .cancellable(sync_kubeconfig(
                self.gateway,
                self.secrets,
                cluster,
                cluster_id,
            ))
            .await??;
        if !synced {
            debug!(cluster_id, "waiting for kubeconfig");
            return Ok(ReconcileOutcome::Requeue);
        }

        let ready = self
            .cancellable(readiness::is_ready(self.gateway, cluster_id))
            .await??;
        if !ready {
            debug!(cluster_id, "waiting for cluster readiness");
            return Ok(ReconcileOutcome::Requeue);
        }

        if status.phase != Phase::Active || status.failure_message.is_some() {
            info!(cluster_id, "cluster active");
            status.phase = Phase::Active;
            self.persist(cluster, status).await?;
        }

        Ok(ReconcileOutcome::Done)
    }

    async fn reconcile_node_pools(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
        cluster_id: i64,
    ) -> Result<(), Error> {
        let remote_pools = self
            .cancellable(self.gateway.list_node_pools(cluster_id))
            .await?
            .map_err(|e| Error::gateway("list node pools", e))?;

        let desired = nodepool::statuses_from_spec(&cluster.spec.node_pools);
        let observed = nodepool::statuses_from_remote(&remote_pools);
        let diff = nodepool::diff(&desired, &observed);

        if diff.is_empty() {
            if status.node_pool_statuses != observed {
                status.node_pool_statuses = observed;
                self.persist(cluster, status).await?;
            }
            return Ok(());
        }

        info!(
            cluster_id,
            create = diff.create.len(),
            update = diff.update.len(),
            delete = diff.delete.len(),
            "reconciling node pools"
        );
        self.set_phase(cluster, status, Phase::Updating).await?;

        self.cancellable(nodepool::apply_diff(self.gateway, cluster_id, &diff))
            .await??;

        self.refresh_node_pools(cluster_id, status).await?;
        self.persist(cluster, status).await
    }

    /// Replace recorded pool statuses with what the provider reports
    async fn refresh_node_pools(
        &self,
        cluster_id: i64,
        status: &mut LkeClusterConfigStatus,
    ) -> Result<(), Error> {
        let pools = self
            .cancellable(self.gateway.list_node_pools(cluster_id))
            .await?
            .map_err(|e| Error::gateway("list node pools", e))?;
        status.node_pool_statuses = nodepool::statuses_from_remote(&pools);
        Ok(())
    }

    async fn set_phase(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
        phase: Phase,
    ) -> Result<(), Error> {
        if status.phase == phase {
            return Ok(());
        }
        debug!(from = %status.phase, to = %phase, "phase transition");
        status.phase = phase;
        self.persist(cluster, status).await
    }

    /// Write the status in one call; a successful write clears any failure
    async fn persist(
        &self,
        cluster: &LkeClusterConfig,
        status: &mut LkeClusterConfigStatus,
    ) -> Result<(), Error> {
        status.failure_message = None;
        let namespace = cluster.namespace().unwrap_or_default();
        self.kube
            .patch_status(&namespace, &cluster.name_any(), status)
            .await
    }

    /// Run a remote step unless the pass has been cancelled
    async fn cancellable<F: Future>(&self, fut: F) -> Result<F::Output, Error> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            out = fut => Ok(out),
        }
    }
}
