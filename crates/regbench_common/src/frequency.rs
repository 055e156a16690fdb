//! Bus clock frequencies with unit parsing and period conversion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::duration::FS_PER_S;

/// A clock frequency stored in whole Hertz.
///
/// Parses strings like `"100kHz"`, `"0.4MHz"`, `"1MHz"`, and bare numbers
/// (interpreted as Hz). Zero is rejected because it has no period.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Frequency(u64);

impl Frequency {
    /// I2C standard mode.
    pub const STANDARD_MODE: Self = Self(100_000);
    /// I2C fast mode.
    pub const FAST_MODE: Self = Self(400_000);

    /// Creates a frequency from a value in Hertz, or `None` for zero.
    pub fn from_hz(hz: u64) -> Option<Self> {
        (hz > 0).then_some(Self(hz))
    }

    /// Returns the frequency in Hertz.
    pub fn hz(&self) -> u64 {
        self.0
    }

    /// Returns one clock period in femtoseconds, rounded to the nearest fs.
    pub fn period_fs(&self) -> u64 {
        (FS_PER_S + self.0 / 2) / self.0
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frequency({self})")
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hz = self.0;
        if hz >= 1_000_000 && hz % 1_000 == 0 {
            write!(f, "{}MHz", hz as f64 / 1_000_000.0)
        } else if hz >= 1_000 && hz % 10 == 0 {
            write!(f, "{}kHz", hz as f64 / 1_000.0)
        } else {
            write!(f, "{hz}Hz")
        }
    }
}

/// Error returned when a frequency string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid frequency: '{input}'")]
pub struct ParseFrequencyError {
    /// The input string that failed to parse.
    pub input: String,
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseFrequencyError {
            input: s.to_string(),
        };

        let lower = s.to_ascii_lowercase();
        let (number, scale) = if let Some(n) = lower.strip_suffix("mhz") {
            (n, 1_000_000.0)
        } else if let Some(n) = lower.strip_suffix("khz") {
            (n, 1_000.0)
        } else if let Some(n) = lower.strip_suffix("hz") {
            (n, 1.0)
        } else {
            (lower.as_str(), 1.0)
        };

        let value: f64 = number.trim().parse().map_err(|_| err())?;
        let hz = (value * scale).round();
        if !hz.is_finite() || hz < 1.0 {
            return Err(err());
        }
        Ok(Frequency(hz as u64))
    }
}
