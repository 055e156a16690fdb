//! Configuration types deserialized from `regbench.toml`.

use regbench_common::{parse_duration, Frequency};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// The top-level bench configuration parsed from `regbench.toml`.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BenchConfig {
    /// Bench-wide settings (name, seed, time limit).
    #[serde(default)]
    pub bench: BenchMeta,
    /// I2C bus settings.
    #[serde(default)]
    pub bus: BusConfig,
    /// The I2C target under test.
    #[serde(default)]
    pub target: TargetConfig,
    /// Reset sequencing.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Waveform dumping.
    #[serde(default)]
    pub waveform: WaveformConfig,
}

/// Bench-wide settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchMeta {
    /// Name used for the top waveform scope and the report.
    pub name: String,
    /// Fixed random seed; a fresh one is drawn per run when absent.
    pub seed: Option<u64>,
    /// Simulated time after which a test is aborted (e.g. `"100ms"`).
    pub time_limit: String,
}

impl Default for BenchMeta {
    fn default() -> Self {
        Self {
            name: "regbench".to_string(),
            seed: None,
            time_limit: "100ms".to_string(),
        }
    }
}

/// I2C bus settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// SCL frequency (e.g. `"100kHz"`, `"400kHz"`).
    pub speed: String,
    /// How long the master tolerates a target holding SCL low.
    pub stretch_timeout: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            speed: "100kHz".to_string(),
            stretch_timeout: "1ms".to_string(),
        }
    }
}

/// The I2C target the tests talk to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// 7-bit slave address.
    pub address: u8,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self { address: 0x70 }
    }
}

/// Reset sequencing.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResetConfig {
    /// How long reset is held, and how long the bench waits after release.
    pub hold: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            hold: "1us".to_string(),
        }
    }
}

/// Waveform dumping.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveformConfig {
    /// Whether every test writes a VCD file.
    pub enabled: bool,
    /// Output directory for `<test>.vcd` files.
    pub dir: PathBuf,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("out"),
        }
    }
}

impl BenchConfig {
    /// Returns the simulated time limit in femtoseconds.
    pub fn time_limit_fs(&self) -> Result<u64, ConfigError> {
        duration_field("bench.time_limit", &self.bench.time_limit)
    }

    /// Returns the bus frequency.
    pub fn bus_speed(&self) -> Result<Frequency, ConfigError> {
        Ok(self.bus.speed.parse()?)
    }

    /// Returns the clock-stretch timeout in femtoseconds.
    pub fn stretch_timeout_fs(&self) -> Result<u64, ConfigError> {
        duration_field("bus.stretch_timeout", &self.bus.stretch_timeout)
    }

    /// Returns the reset hold time in femtoseconds.
    pub fn reset_hold_fs(&self) -> Result<u64, ConfigError> {
        duration_field("reset.hold", &self.reset.hold)
    }
}

fn duration_field(field: &'static str, value: &str) -> Result<u64, ConfigError> {
    parse_duration(value).map_err(|source| ConfigError::InvalidDuration { field, source })
}
