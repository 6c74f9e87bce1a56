//! Controller configuration
//!
//! Every setting is a command-line flag that can also be supplied through
//! the environment, so the same binary works locally and in a Deployment.

use std::time::Duration;

use clap::Args;

use crate::backoff::BackoffConfig;

/// Default delay before re-checking a cluster with work in flight
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 10;

/// Default delay between drift checks of a converged cluster
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default delay after the first failed reconciliation
pub const DEFAULT_BACKOFF_INITIAL_SECS: u64 = 5;

/// Default upper bound on error backoff
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Tunables of the LKEClusterConfig controller
///
/// Embedders that supply their own `GatewayFactory` flatten this into their
/// CLI with `#[command(flatten)]` and pass it to `controller::run`; the
/// `lke-operator config` command prints the values it resolves to.
#[derive(Args, Clone, Debug, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Seconds before re-checking a cluster that is still converging
    #[arg(
        long = "requeue-interval-secs",
        env = "LKE_REQUEUE_INTERVAL_SECS",
        default_value_t = DEFAULT_REQUEUE_INTERVAL_SECS
    )]
    pub requeue_interval_secs: u64,

    /// Seconds between drift checks of an active cluster
    #[arg(
        long = "resync-interval-secs",
        env = "LKE_RESYNC_INTERVAL_SECS",
        default_value_t = DEFAULT_RESYNC_INTERVAL_SECS
    )]
    pub resync_interval_secs: u64,

    /// Only watch this namespace (all namespaces when unset)
    #[arg(long = "watch-namespace", env = "LKE_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Seconds to wait after the first failure of a cluster
    #[arg(
        long = "backoff-initial-secs",
        env = "LKE_BACKOFF_INITIAL_SECS",
        default_value_t = DEFAULT_BACKOFF_INITIAL_SECS
    )]
    pub backoff_initial_secs: u64,

    /// Maximum seconds to wait between failed attempts
    #[arg(
        long = "backoff-max-secs",
        env = "LKE_BACKOFF_MAX_SECS",
        default_value_t = DEFAULT_BACKOFF_MAX_SECS
    )]
    pub backoff_max_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            requeue_interval_secs: DEFAULT_REQUEUE_INTERVAL_SECS,
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            watch_namespace: None,
            backoff_initial_secs: DEFAULT_BACKOFF_INITIAL_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
        }
    }
}

impl ControllerConfig {
    /// Delay before re-checking a converging cluster
    pub fn requeue_interval(&self) -> Duration {
        Duration::from_secs(self.requeue_interval_secs)
    }

    /// Delay between drift checks of a converged cluster
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Error backoff bounds
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig {
            initial_delay: Duration::from_secs(self.backoff_initial_secs),
            max_delay: Duration::from_secs(self.backoff_max_secs.max(self.backoff_initial_secs)),
            ..Default::default()
        }
    }
}
