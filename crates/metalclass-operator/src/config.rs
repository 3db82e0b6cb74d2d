//! Operator Configuration
//!
//! Runtime settings for the class controller. Every setting can be given as a
//! command line flag or through its `METALCLASS_*` environment variable.

use clap::{Args, ValueEnum};
use std::net::SocketAddr;
use std::time::Duration;

/// Log output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Flags accepted by `metalclass-operator run`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Maximum number of classes reconciled concurrently
    #[arg(long, env = "METALCLASS_CONCURRENCY", default_value_t = 4)]
    pub concurrency: u16,

    /// Deadline for each Kubernetes API call made during a reconcile
    #[arg(long, env = "METALCLASS_STORE_TIMEOUT_SECS", default_value_t = 10)]
    pub store_timeout_secs: u64,

    /// Interval after which every class is reconciled again
    #[arg(long, env = "METALCLASS_RESYNC_SECS", default_value_t = 300)]
    pub resync_secs: u64,

    /// Requeue delay after a failed reconcile
    #[arg(long, env = "METALCLASS_ERROR_REQUEUE_SECS", default_value_t = 60)]
    pub error_requeue_secs: u64,

    /// Requeue delay after a status write lost an update race
    #[arg(long, env = "METALCLASS_CONFLICT_REQUEUE_SECS", default_value_t = 1)]
    pub conflict_requeue_secs: u64,

    /// Address for the Prometheus metrics endpoint (disabled when unset)
    #[arg(long, env = "METALCLASS_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Operator configuration with sensible defaults
#[derive(Debug, Clone)]
pub struct OperatorConfig {
    /// Bounded worker pool size for the controller
    pub concurrency: u16,

    /// Deadline for a single store read or write
    pub store_timeout: Duration,

    /// Periodic resync of each class after a successful reconcile
    pub resync_interval: Duration,

    /// Requeue delay for transient failures
    pub error_requeue: Duration,

    /// Requeue delay for optimistic-concurrency conflicts
    pub conflict_requeue: Duration,

    pub metrics_addr: Option<SocketAddr>,

    pub log_format: LogFormat,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            store_timeout: Duration::from_secs(10),
            resync_interval: Duration::from_secs(300),
            error_requeue: Duration::from_secs(60),
            conflict_requeue: Duration::from_secs(1),
            metrics_addr: None,
            log_format: LogFormat::Text,
        }
    }
}

impl From<RunArgs> for OperatorConfig {
    fn from(args: RunArgs) -> Self {
        Self {
            concurrency: args.concurrency,
            store_timeout: Duration::from_secs(args.store_timeout_secs),
            resync_interval: Duration::from_secs(args.resync_secs),
            error_requeue: Duration::from_secs(args.error_requeue_secs),
            conflict_requeue: Duration::from_secs(args.conflict_requeue_secs),
            metrics_addr: args.metrics_addr,
            log_format: args.log_format,
        }
    }
}
