//! Production configuration validation
//!
//! Security checks for production deployments.

use super::config::AppConfig;
use anyhow::{bail, Result};
use tracing::warn;

/// Validate configuration, warning about risky production settings
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.canvas.width == 0 || config.canvas.height == 0 {
        bail!(
            "Canvas size must be positive, got {}x{}",
            config.canvas.width,
            config.canvas.height
        );
    }

    if config
        .admin
        .password
        .as_deref()
        .map_or(true, |p| p.trim().is_empty())
    {
        warn!(
            "No replace-canvas password configured (PASSWORD or [admin] password). \
             Every /updateorders request will be refused."
        );
    }

    let is_production = std::env::var("PLACEBOARD_ENV")
        .map(|v| v.to_lowercase() == "production")
        .unwrap_or(false);

    if !is_production {
        return Ok(());
    }

    if config.server.host == "0.0.0.0" {
        warn!(
            "SECURITY WARNING: Server is binding to all interfaces (0.0.0.0) in production. \
             Consider binding to 127.0.0.1 and using a reverse proxy."
        );
    }

    if config
        .admin
        .password
        .as_deref()
        .is_some_and(|p| p.len() < 12)
    {
        warn!("SECURITY WARNING: Replace-canvas password is shorter than 12 characters.");
    }

    Ok(())
}
