//! LKE operator - declarative Linode Kubernetes Engine clusters
//!
//! An `LKEClusterConfig` resource describes a managed cluster: region,
//! Kubernetes version, control plane availability, node pools and tags. The
//! operator converges the remote cluster towards that description, records
//! what it observed in the resource status, and publishes the cluster's
//! kubeconfig as a Secret.
//!
//! # Modules
//!
//! - [`crd`] - The LKEClusterConfig custom resource
//! - [`controller`] - Reconciliation engine and kube-rs controller glue
//! - [`gateway`] - Provider API seam and wire types
//! - [`nodepool`] - Node pool diffing and the logical-name tag contract
//! - [`version`] - Kubernetes version resolution
//! - [`tags`] - Cluster tag handling
//! - [`kubeconfig`] - Kubeconfig secret synchronization
//! - [`readiness`] - Cluster readiness probing
//! - [`backoff`] - Per-resource error backoff
//! - [`config`] - Controller configuration
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod backoff;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod gateway;
pub mod kubeconfig;
pub mod nodepool;
pub mod readiness;
pub mod tags;
pub mod version;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
