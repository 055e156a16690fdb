//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::BenchConfig;
use std::path::Path;

/// File name looked up in the bench directory.
pub const CONFIG_FILE_NAME: &str = "regbench.toml";

/// Loads and validates a `regbench.toml` configuration from a bench directory.
///
/// Reads `<bench_dir>/regbench.toml`, parses it, and validates every field.
pub fn load_config(bench_dir: &Path) -> Result<BenchConfig, ConfigError> {
    load_config_file(&bench_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<BenchConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Like [`load_config`], but falls back to the defaults when the directory
/// has no `regbench.toml`.
pub fn load_config_or_default(bench_dir: &Path) -> Result<BenchConfig, ConfigError> {
    let path = bench_dir.join(CONFIG_FILE_NAME);
    if path.is_file() {
        load_config_file(&path)
    } else {
        Ok(BenchConfig::default())
    }
}

/// Parses and validates a `regbench.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<BenchConfig, ConfigError> {
    let config: BenchConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that every value parses and the target address is usable.
fn validate_config(config: &BenchConfig) -> Result<(), ConfigError> {
    if config.bench.name.is_empty() {
        return Err(ConfigError::ValidationError(
            "bench.name must not be empty".to_string(),
        ));
    }

    let address = config.target.address;
    if address > 0x7F {
        return Err(ConfigError::ValidationError(format!(
            "target.address {address:#04x} is not a 7-bit address"
        )));
    }
    // 0000xxx and 1111xxx are reserved addresses
    if address < 0x08 || address > 0x77 {
        return Err(ConfigError::ValidationError(format!(
            "target.address {address:#04x} is reserved"
        )));
    }

    config.bus_speed()?;
    config.stretch_timeout_fs()?;
    let hold = config.reset_hold_fs()?;
    if hold == 0 {
        return Err(ConfigError::ValidationError(
            "reset.hold must be longer than zero".to_string(),
        ));
    }
    config.time_limit_fs()?;
    Ok(())
}
