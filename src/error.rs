//! Error types for the LKE operator

use thiserror::Error;

use crate::gateway::GatewayError;

/// Main error type for LKE operator operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Remote provider call failed
    #[error("gateway error during {operation}: {source}")]
    Gateway {
        /// Name of the remote operation (e.g. "get cluster")
        operation: String,
        /// Classified provider error
        #[source]
        source: GatewayError,
    },

    /// A Kubernetes version reported by the provider could not be parsed
    #[error("invalid LKE version {version:?}: {reason}")]
    InvalidVersion {
        /// The offending version string
        version: String,
        /// Why it was rejected
        reason: String,
    },

    /// Deletion was requested but no remote cluster ID was ever recorded
    #[error("no cluster ID recorded for {name}")]
    NoClusterId {
        /// Name of the LKEClusterConfig
        name: String,
    },

    /// Validation error for CRD specs
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The reconciliation pass was cancelled before it finished
    #[error("reconciliation cancelled")]
    Cancelled,
}

impl Error {
    /// Wrap a gateway error with the name of the operation that produced it
    pub fn gateway(operation: impl Into<String>, source: GatewayError) -> Self {
        Self::Gateway {
            operation: operation.into(),
            source,
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
