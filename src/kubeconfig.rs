//! Kubeconfig synchronization
//!
//! Copies the provider's kubeconfig into a Secret next to the
//! LKEClusterConfig so workloads can reach the managed cluster.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::crd::LkeClusterConfig;
use crate::gateway::{GatewayError, LkeGateway};
use crate::Error;

/// Data key holding the kubeconfig document
pub const KUBECONFIG_KEY: &str = "kubeconfig";

/// Label marking secrets owned by the operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`]
pub const MANAGED_BY_VALUE: &str = "lke-operator";

/// Name of the secret holding a cluster's kubeconfig
pub fn secret_name(cluster_name: &str) -> String {
    format!("{cluster_name}-kubeconfig")
}

/// Secret persistence used by the synchronizer
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret, `None` when it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error>;

    /// Create a secret
    async fn create(&self, namespace: &str, secret: &Secret) -> Result<(), Error>;

    /// Replace an existing secret
    async fn replace(&self, namespace: &str, secret: &Secret) -> Result<(), Error>;
}

/// [`SecretStore`] backed by the Kubernetes API
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    /// Create a store using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create(&self, namespace: &str, secret: &Secret) -> Result<(), Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), secret).await?;
        Ok(())
    }

    async fn replace(&self, namespace: &str, secret: &Secret) -> Result<(), Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.replace(&secret.name_any(), &PostParams::default(), secret)
            .await?;
        Ok(())
    }
}

/// Ensure the kubeconfig secret matches the provider's kubeconfig
///
/// Returns `false` while the provider has no kubeconfig yet. An identical
/// secret is left untouched.
pub async fn sync_kubeconfig(
    gateway: &dyn LkeGateway,
    secrets: &dyn SecretStore,
    cluster: &LkeClusterConfig,
    cluster_id: i64,
) -> Result<bool, Error> {
    let kubeconfig = match gateway.get_kubeconfig(cluster_id).await {
        Ok(kc) => kc,
        Err(GatewayError::NotAvailable) => {
            debug!(cluster_id, "kubeconfig not available yet");
            return Ok(false);
        }
        Err(e) => return Err(Error::gateway("get kubeconfig", e)),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(kubeconfig.kubeconfig.trim())
        .map_err(|e| Error::serialization(format!("kubeconfig is not valid base64: {e}")))?;

    let namespace = cluster.namespace().unwrap_or_default();
    let name = secret_name(&cluster.name_any());

    match secrets.get(&namespace, &name).await? {
        None => {
            info!(secret = %name, "creating kubeconfig secret");
            secrets
                .create(&namespace, &build_secret(cluster, &namespace, &name, bytes))
                .await?;
        }
        Some(existing) => {
            let current = existing
                .data
                .as_ref()
                .and_then(|data| data.get(KUBECONFIG_KEY));
            if current.map(|b| b.0.as_slice()) == Some(bytes.as_slice()) {
                debug!(secret = %name, "kubeconfig secret up to date");
                return Ok(true);
            }

            info!(secret = %name, "updating kubeconfig secret");
            let mut updated = existing;
            updated
                .data
                .get_or_insert_with(BTreeMap::new)
                .insert(KUBECONFIG_KEY.to_string(), ByteString(bytes));
            secrets.replace(&namespace, &updated).await?;
        }
    }

    Ok(true)
}

fn build_secret(cluster: &LkeClusterConfig, namespace: &str, name: &str, bytes: Vec<u8>) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                MANAGED_BY_LABEL.to_string(),
                MANAGED_BY_VALUE.to_string(),
            )])),
            owner_references: cluster.controller_owner_ref(&()).map(|r| vec![r]),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            KUBECONFIG_KEY.to_string(),
            ByteString(bytes),
        )])),
        ..Default::default()
    }
}
