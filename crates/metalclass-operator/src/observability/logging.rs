//! Logging setup
//!
//! Console logging filtered by `RUST_LOG` (default `info`), in text or JSON
//! format depending on `--log-format` / `LOG_FORMAT`.

use crate::config::LogFormat;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
        LogFormat::Text => registry.with(fmt::layer()).try_init()?,
    }

    tracing::debug!(?format, "Logging initialized");
    Ok(())
}
