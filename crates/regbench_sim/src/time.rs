//! Simulation time with femtosecond precision and delta cycles.
//!
//! [`SimTime`] tracks both simulated wall-clock time (in femtoseconds) and
//! the delta cycle index within a single time step, so that zero-delay
//! updates scheduled by the testbench and by device processes are applied in
//! a well-defined order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use regbench_common::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_US};

/// A simulation time point with femtosecond resolution and delta tracking.
///
/// Ordered first by femtosecond timestamp, then by delta cycle index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulated time in femtoseconds.
    pub fs: u64,
    /// Delta cycle index within the current time step.
    pub delta: u32,
}

impl SimTime {
    /// Creates a time point at time zero, delta zero.
    pub fn zero() -> Self {
        Self { fs: 0, delta: 0 }
    }

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Creates a time from a microsecond value with delta 0.
    pub fn from_us(us: u64) -> Self {
        Self::from_fs(us * FS_PER_US)
    }

    /// Returns the next delta cycle at the same femtosecond.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Advances to a later femtosecond, resetting the delta counter.
    pub fn advance_to(&self, new_fs: u64) -> Self {
        debug_assert!(
            new_fs >= self.fs,
            "cannot advance backwards: {} -> {}",
            self.fs,
            new_fs
        );
        Self {
            fs: new_fs,
            delta: 0,
        }
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        if fs == 0 {
            write!(f, "0 fs")?;
        } else if fs % FS_PER_MS == 0 {
            write!(f, "{} ms", fs / FS_PER_MS)?;
        } else if fs % FS_PER_US == 0 {
            write!(f, "{} us", fs / FS_PER_US)?;
        } else if fs % FS_PER_NS == 0 {
            write!(f, "{} ns", fs / FS_PER_NS)?;
        } else if fs % FS_PER_PS == 0 {
            write!(f, "{} ps", fs / FS_PER_PS)?;
        } else {
            write!(f, "{fs} fs")?;
        }
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}
