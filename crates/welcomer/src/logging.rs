//! Logging system setup

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use welcome_system::config::LoggingSettings;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn setup_logging(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    if settings.json_format {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false).with_thread_names(true))
            .try_init()?;
    }

    info!("🔧 Logging initialized with level: {}", settings.level);
    Ok(())
}
