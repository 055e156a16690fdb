//! Simulation duration constants and parsing of strings like `"1us"`.

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDurationError {
    /// The input was empty.
    #[error("empty duration")]
    Empty,
    /// The input did not start with a number.
    #[error("no numeric value in '{0}'")]
    MissingNumber(String),
    /// The input had no unit suffix.
    #[error("missing unit in '{0}'")]
    MissingUnit(String),
    /// The unit suffix is not one of `fs ps ns us ms s`.
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
    /// The value does not fit in 64 bits of femtoseconds.
    #[error("duration '{0}' is too large")]
    Overflow(String),
}

/// Parses a duration string into femtoseconds.
///
/// Accepts an integer followed by one of `fs`, `ps`, `ns`, `us`, `ms`, `s`,
/// with optional whitespace in between.
pub fn parse_duration(s: &str) -> Result<u64, ParseDurationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ParseDurationError::Empty);
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digit_end == 0 {
        return Err(ParseDurationError::MissingNumber(s.to_string()));
    }
    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| ParseDurationError::Overflow(s.to_string()))?;

    let multiplier = match s[digit_end..].trim() {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        "" => return Err(ParseDurationError::MissingUnit(s.to_string())),
        unit => return Err(ParseDurationError::UnknownUnit(unit.to_string())),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| ParseDurationError::Overflow(s.to_string()))
}
