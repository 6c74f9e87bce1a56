//! Controller for LKEClusterConfig resources
//!
//! The engine converges a single resource against the provider; the
//! surrounding glue plugs it into the kube-rs controller runtime.

mod cluster;
mod engine;
mod runner;

pub use cluster::{
    error_policy, reconcile, Context, KubeClient, KubeClientImpl, CLUSTER_FINALIZER,
    FIELD_MANAGER,
};
pub use engine::{Engine, ReconcileOutcome};
pub use runner::{ensure_crd_installed, run};
