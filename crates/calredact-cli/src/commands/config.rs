//! Configuration commands.

use std::path::Path;

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// Dump the effective configuration to stdout. The password is never shown.
pub fn dump(config: &AppConfig, path: &Path) -> CliResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", path.display());
    println!("{}", toml_str);
    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &AppConfig) -> CliResult<()> {
    config.validate().map_err(CliError::Config)?;

    if config.caldav.url.is_none() {
        println!("No CalDAV URL configured; set caldav.url or CALDAV_ROOT.");
    }
    let policy = config.policy.to_policy();
    println!(
        "Policy keeps {} and redacts {} properties.",
        policy.kept().len(),
        policy.redacted().len()
    );
    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path(path: &Path) -> CliResult<()> {
    println!("config: {}", path.display());
    Ok(())
}
