//! Configuration commands.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig, path: &Path) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    config.validate()?;

    let storage = &config.storage;
    for (name, path) in [
        ("events", storage.events_path()),
        ("catalog", storage.catalog_path()),
    ] {
        if !path.exists() {
            println!("{name} file does not exist yet: {}", path.display());
        }
    }

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration and data file paths.
pub fn path(config: &ClientConfig, config_path: &Path) -> ClientResult<()> {
    println!("config: {}", config_path.display());
    println!("events: {}", config.storage.events_path().display());
    println!("catalog: {}", config.storage.catalog_path().display());
    Ok(())
}
