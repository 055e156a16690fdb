//! Signal state, drivers, and per-bit drive-strength resolution.
//!
//! Each simulation signal has a flat [`SimSignalId`], a current value, and
//! zero or more drivers. A driver has a fixed [`DriveStrength`] and a value
//! that changes over time; bits driven as `Z` contribute nothing. This is what
//! makes open-drain buses work: a pull-up is a [`DriveStrength::Pull`] driver
//! of all ones, and anyone pulling low with [`DriveStrength::Strong`] wins.

use regbench_common::{Logic, LogicVec};
use serde::{Deserialize, Serialize};

/// Opaque ID for a simulation signal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct SimSignalId(u32);

impl SimSignalId {
    /// Creates a `SimSignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to one driver attached to a signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct DriverId {
    signal: SimSignalId,
    slot: u32,
}

impl DriverId {
    pub(crate) fn new(signal: SimSignalId, slot: usize) -> Self {
        Self {
            signal,
            slot: slot as u32,
        }
    }

    /// Returns the signal this driver is attached to.
    pub fn signal(self) -> SimSignalId {
        self.signal
    }

    pub(crate) fn slot(self) -> usize {
        self.slot as usize
    }
}

/// Drive strength levels, ordered from weakest to strongest.
///
/// When several drivers contribute a definite value to the same bit, the
/// strongest wins; disagreement at equal strength produces X.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DriveStrength {
    /// High-impedance (never contributes).
    HighImpedance,
    /// Weak drive (bus keepers).
    Weak,
    /// Pull drive (pull-up and pull-down resistors).
    Pull,
    /// Strong drive (push-pull outputs, open-drain low).
    Strong,
    /// Supply-level drive.
    Supply,
}

/// A single driver contributing a value to a signal.
#[derive(Clone, Debug, PartialEq)]
pub struct Driver {
    /// The value this driver is asserting; `Z` bits are released.
    pub value: LogicVec,
    /// The strength of this driver.
    pub strength: DriveStrength,
}

/// The runtime state of a simulation signal.
///
/// Tracks the current value and the value before the most recent change for
/// edge detection, plus every driver attached to the signal.
#[derive(Clone, Debug)]
pub struct SimSignalState {
    /// Current signal value.
    pub value: LogicVec,
    /// Value before the most recent change.
    pub previous_value: LogicVec,
    /// Drivers attached to this signal, indexed by [`DriverId`] slot.
    pub drivers: Vec<Driver>,
    /// Signal name for lookup and waveform output.
    pub name: String,
    /// Bit width of this signal.
    pub width: u32,
}

impl SimSignalState {
    /// Creates a new undriven signal holding `init_value`.
    pub fn new(name: String, init_value: LogicVec) -> Self {
        Self {
            width: init_value.width(),
            previous_value: init_value.clone(),
            value: init_value,
            drivers: Vec::new(),
            name,
        }
    }

    /// Returns the value of bit 0.
    pub fn logic(&self) -> Logic {
        self.value.get(0)
    }
}

/// Resolves the contributions of all drivers into a single value, bit by bit.
///
/// For each bit:
/// 1. `Z` contributions and `HighImpedance` drivers are ignored.
/// 2. If nothing remains, the bit is `Z`.
/// 3. Otherwise the strongest contributions are compared; if they agree the
///    bit takes their value, else it is `X`.
pub fn resolve_drivers(drivers: &[Driver], width: u32) -> LogicVec {
    let mut result = LogicVec::filled(width, Logic::Z);
    for bit in 0..width {
        let mut best: Option<(DriveStrength, Logic)> = None;
        for driver in drivers {
            if driver.strength == DriveStrength::HighImpedance {
                continue;
            }
            let level = driver.value.get(bit);
            if level == Logic::Z {
                continue;
            }
            best = match best {
                None => Some((driver.strength, level)),
                Some((strength, _)) if driver.strength > strength => Some((driver.strength, level)),
                Some((strength, current)) if driver.strength == strength && current != level => {
                    Some((strength, Logic::X))
                }
                keep => keep,
            };
        }
        if let Some((_, level)) = best {
            result.set(bit, level);
        }
    }
    result
}
