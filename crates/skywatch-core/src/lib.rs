//! Core foundation for Skywatch: configuration and logging setup.
//!
//! The weather subsystem and any embedding shell share the tunables
//! defined here; nothing in this crate touches the network.

pub mod config;

pub use config::{
    ApiConfig, CacheConfig, Config, ForecastConfig, PollingConfig, TriggerConfig,
    ValidationResult,
};

use anyhow::Result;

/// Initialize tracing for the host process.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skywatch core initialized");
    Ok(())
}
