//! LKEClusterConfig controller implementation
//!
//! Glue between the kube-rs controller runtime and the reconciliation
//! engine: finalizer handling, status persistence, failure reporting and
//! error backoff.

use std::sync::Arc;

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::{Client, Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

use super::engine::{Engine, ReconcileOutcome};
use crate::backoff::ErrorBackoff;
use crate::config::ControllerConfig;
use crate::crd::{LkeClusterConfig, LkeClusterConfigStatus};
use crate::gateway::GatewayFactory;
use crate::kubeconfig::{KubeSecretStore, SecretStore};
use crate::Error;

/// Finalizer guarding deletion of the remote cluster
pub const CLUSTER_FINALIZER: &str = "lke.anza-labs.dev/finalizer";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "lke-operator";

/// Trait abstracting Kubernetes client operations for LKEClusterConfig
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Replace the status of an LKEClusterConfig in a single write
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &LkeClusterConfigStatus,
    ) -> Result<(), Error>;

    /// Add the cluster finalizer
    async fn add_finalizer(&self, namespace: &str, name: &str) -> Result<(), Error>;

    /// Remove the cluster finalizer
    async fn remove_finalizer(&self, namespace: &str, name: &str) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<LkeClusterConfig> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn set_finalizers(
        &self,
        namespace: &str,
        name: &str,
        finalizers: Vec<String>,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({
            "metadata": {
                "finalizers": finalizers
            }
        });

        self.api(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn patch_status(
        &self,
        namespace: &str,
        name: &str,
        status: &LkeClusterConfigStatus,
    ) -> Result<(), Error> {
        // Apply owns the whole status, so dropped node pools are pruned
        let status_patch = serde_json::json!({
            "apiVersion": LkeClusterConfig::api_version(&()),
            "kind": LkeClusterConfig::kind(&()),
            "status": status
        });

        self.api(namespace)
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(&status_patch),
            )
            .await?;
        Ok(())
    }

    async fn add_finalizer(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let cluster = self.api(namespace).get(name).await?;
        let mut finalizers = cluster.metadata.finalizers.unwrap_or_default();

        if finalizers.iter().any(|f| f == CLUSTER_FINALIZER) {
            return Ok(());
        }

        finalizers.push(CLUSTER_FINALIZER.to_string());
        self.set_finalizers(namespace, name, finalizers).await
    }

    async fn remove_finalizer(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let cluster = match self.api(namespace).get_opt(name).await? {
            Some(cluster) => cluster,
            None => return Ok(()),
        };

        let finalizers: Vec<String> = cluster
            .metadata
            .finalizers
            .unwrap_or_default()
            .into_iter()
            .filter(|f| f != CLUSTER_FINALIZER)
            .collect();
        self.set_finalizers(namespace, name, finalizers).await
    }
}

/// Controller context shared across reconciliations
pub struct Context {
    /// Kubernetes client for status and finalizer writes
    pub kube: Arc<dyn KubeClient>,
    /// Store for kubeconfig secrets
    pub secrets: Arc<dyn SecretStore>,
    /// Builds an authorised gateway per resource
    pub gateways: Arc<dyn GatewayFactory>,
    /// Controller tunables
    pub config: ControllerConfig,
    /// Per-resource error backoff
    pub backoff: ErrorBackoff,
    /// Cancelled when the controller shuts down
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a context backed by the given Kubernetes client
    pub fn new(client: Client, gateways: Arc<dyn GatewayFactory>, config: ControllerConfig) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client.clone())),
            secrets: Arc::new(KubeSecretStore::new(client)),
            gateways,
            backoff: ErrorBackoff::new(config.backoff()),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Create a context for testing with custom mock clients
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn KubeClient>,
        secrets: Arc<dyn SecretStore>,
        gateways: Arc<dyn GatewayFactory>,
    ) -> Self {
        let config = ControllerConfig::default();
        Self {
            kube,
            secrets,
            gateways,
            backoff: ErrorBackoff::new(config.backoff()),
            config,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Reconcile an LKEClusterConfig resource
///
/// Adds the finalizer, validates the spec and hands the resource to the
/// engine. Deletion runs the engine's teardown until the remote cluster is
/// gone, then releases the finalizer.
#[instrument(skip(cluster, ctx), fields(cluster = %cluster.name_any()))]
pub async fn reconcile(cluster: Arc<LkeClusterConfig>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_default();
    let key = resource_key(&cluster);
    let mut status = cluster.status.clone().unwrap_or_default();

    if cluster.metadata.deletion_timestamp.is_some() {
        return handle_deletion(&cluster, &ctx, &mut status).await;
    }

    if let Err(e) = cluster.spec.validate() {
        warn!(error = %e, "cluster validation failed");
        record_failure(&cluster, &ctx, &mut status, &e).await;
        // Invalid specs need an edit, not a retry
        return Ok(Action::await_change());
    }

    if !has_finalizer(&cluster) {
        info!("adding finalizer");
        ctx.kube.add_finalizer(&namespace, &name).await?;
    }

    debug!(phase = %status.phase, cluster_id = ?status.cluster_id, "reconciling cluster");

    let gateway = match ctx.gateways.connect(&cluster).await {
        Ok(gateway) => gateway,
        Err(e) => {
            record_failure(&cluster, &ctx, &mut status, &e).await;
            return Err(e);
        }
    };

    let engine = Engine::new(
        gateway.as_ref(),
        ctx.kube.as_ref(),
        ctx.secrets.as_ref(),
        &ctx.shutdown,
    );

    match engine.on_change(&cluster, &mut status).await {
        Ok(outcome) => {
            ctx.backoff.reset(&key);
            Ok(action_for(outcome, &ctx.config))
        }
        Err(e) => {
            record_failure(&cluster, &ctx, &mut status, &e).await;
            Err(e)
        }
    }
}

/// Drive deletion of the remote cluster behind the finalizer
async fn handle_deletion(
    cluster: &LkeClusterConfig,
    ctx: &Context,
    status: &mut LkeClusterConfigStatus,
) -> Result<Action, Error> {
    let name = cluster.name_any();
    let namespace = cluster.namespace().unwrap_or_default();

    if !has_finalizer(cluster) {
        return Ok(Action::await_change());
    }

    if status.cluster_id.is_none() {
        info!("no remote cluster recorded, releasing finalizer");
        ctx.kube.remove_finalizer(&namespace, &name).await?;
        return Ok(Action::await_change());
    }

    let gateway = match ctx.gateways.connect(cluster).await {
        Ok(gateway) => gateway,
        Err(e) => {
            record_failure(cluster, ctx, status, &e).await;
            return Err(e);
        }
    };

    let engine = Engine::new(
        gateway.as_ref(),
        ctx.kube.as_ref(),
        ctx.secrets.as_ref(),
        &ctx.shutdown,
    );

    match engine.on_delete(cluster, status).await {
        Ok(ReconcileOutcome::Done) => {
            info!(cluster_id = ?status.cluster_id, "remote cluster deleted, releasing finalizer");
            ctx.kube.remove_finalizer(&namespace, &name).await?;
            ctx.backoff.reset(&resource_key(cluster));
            Ok(Action::await_change())
        }
        Ok(ReconcileOutcome::Requeue) => {
            ctx.backoff.reset(&resource_key(cluster));
            Ok(Action::requeue(ctx.config.requeue_interval()))
        }
        Err(e) => {
            record_failure(cluster, ctx, status, &e).await;
            Err(e)
        }
    }
}

/// Error policy for the controller
///
/// Consecutive failures of the same resource back off exponentially.
pub fn error_policy(cluster: Arc<LkeClusterConfig>, error: &Error, ctx: Arc<Context>) -> Action {
    if matches!(error, Error::Cancelled) {
        debug!(cluster = %cluster.name_any(), "reconciliation cancelled");
        return Action::await_change();
    }

    let delay = ctx.backoff.next_delay(&resource_key(&cluster));
    error!(
        ?error,
        cluster = %cluster.name_any(),
        retry_in = ?delay,
        "reconciliation failed"
    );
    Action::requeue(delay)
}

fn action_for(outcome: ReconcileOutcome, config: &ControllerConfig) -> Action {
    match outcome {
        ReconcileOutcome::Requeue => Action::requeue(config.requeue_interval()),
        ReconcileOutcome::Done => Action::requeue(config.resync_interval()),
    }
}

/// Record a failure on the status so owners can see it
///
/// Best effort: a failed write is logged and the original error wins.
async fn record_failure(
    cluster: &LkeClusterConfig,
    ctx: &Context,
    status: &mut LkeClusterConfigStatus,
    error: &Error,
) {
    if matches!(error, Error::Cancelled) {
        return;
    }

    status.failure_message = Some(error.to_string());
    let namespace = cluster.namespace().unwrap_or_default();
    if let Err(e) = ctx
        .kube
        .patch_status(&namespace, &cluster.name_any(), status)
        .await
    {
        warn!(error = %e, "failed to record failure message");
    }
}

fn has_finalizer(cluster: &LkeClusterConfig) -> bool {
    cluster.finalizers().iter().any(|f| f == CLUSTER_FINALIZER)
}

fn resource_key(cluster: &LkeClusterConfig) -> String {
    format!(
        "{}/{}",
        cluster.namespace().unwrap_or_default(),
        cluster.name_any()
    )
}
