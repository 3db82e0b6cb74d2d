//! Observability Module
//!
//! - `logging`: tracing subscriber setup (text or JSON)
//! - `metrics`: Prometheus metrics for reconciles, status writes and fan-out

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
