//! Controller wiring
//!
//! Installs the CRD and runs a kube-rs `Controller` for LKEClusterConfig
//! until a shutdown signal arrives.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Client, CustomResourceExt, ResourceExt};
use tracing::{debug, error, info, warn};

use super::cluster::{error_policy, reconcile, Context, FIELD_MANAGER};
use crate::config::ControllerConfig;
use crate::crd::LkeClusterConfig;
use crate::gateway::GatewayFactory;
use crate::kubeconfig::{MANAGED_BY_LABEL, MANAGED_BY_VALUE};
use crate::Error;

/// Install or update the LKEClusterConfig CRD
pub async fn ensure_crd_installed(client: &Client) -> Result<(), Error> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let crd = LkeClusterConfig::crd();
    let name = crd.name_any();

    info!(crd = %name, "installing CRD");
    crds.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&crd),
    )
    .await?;
    Ok(())
}

/// Run the controller until SIGINT or SIGTERM
///
/// In-flight passes are cancelled on shutdown; the status they already
/// wrote stays valid.
pub async fn run(
    client: Client,
    gateways: Arc<dyn GatewayFactory>,
    config: ControllerConfig,
) -> Result<(), Error> {
    ensure_crd_installed(&client).await?;

    let (clusters, secrets): (Api<LkeClusterConfig>, Api<Secret>) = match config.watch_namespace {
        Some(ref ns) => {
            info!(namespace = %ns, "watching single namespace");
            (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            )
        }
        None => (Api::all(client.clone()), Api::all(client.clone())),
    };

    let ctx = Arc::new(Context::new(client, gateways, config));
    let token = ctx.shutdown.clone();

    info!("starting LKEClusterConfig controller");
    Controller::new(clusters, WatcherConfig::default())
        .owns(
            secrets,
            WatcherConfig::default().labels(&format!("{MANAGED_BY_LABEL}={MANAGED_BY_VALUE}")),
        )
        .graceful_shutdown_on(async move {
            shutdown_signal().await;
            info!("shutdown requested, cancelling in-flight reconciliations");
            token.cancel();
        })
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    debug!(cluster = %obj.name, ?action, "reconciliation completed");
                }
                Err(e) => {
                    error!(error = ?e, "reconciliation error");
                }
            }
        })
        .await;

    info!("LKEClusterConfig controller stopped");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "cannot listen for SIGTERM"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
    }
}
