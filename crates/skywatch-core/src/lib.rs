pub mod config;
pub mod error;
pub mod i18n;
pub mod preferences;

pub use config::{ApiConfig, Config, ValidationResult};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt, StorageError};
pub use i18n::Language;
pub use preferences::{Preferences, SharedPreferences, UnitSystem};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("SkyWatch core initialized");
    Ok(())
}
