//! Device-side processes and the context they evaluate in.
//!
//! A [`Process`] models a piece of hardware. The kernel evaluates it in every
//! delta cycle where one of its sensitive signals changed, handing it a
//! [`ProcessContext`] through which it reads signals and schedules driver
//! updates. Updates never apply immediately: they land in a later delta, so
//! every process in a delta sees the same signal values.

use std::collections::BTreeSet;

use regbench_common::{Logic, LogicVec};

use crate::error::SimError;
use crate::time::SimTime;
use crate::value::{DriverId, SimSignalId, SimSignalState};

/// A signal transition on bit 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Edge {
    /// `0 -> 1`.
    Rising,
    /// `1 -> 0`.
    Falling,
}

/// A driver update requested by a process.
#[derive(Clone, Debug)]
pub(crate) struct ScheduledDrive {
    pub driver: DriverId,
    pub value: LogicVec,
    /// Zero means "next delta".
    pub delay_fs: u64,
}

/// A simulated piece of hardware evaluated by the kernel.
pub trait Process {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Reacts to the signal changes of the current delta cycle.
    fn evaluate(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError>;
}

/// The view of the simulation a [`Process`] gets while evaluating.
pub struct ProcessContext<'a> {
    pub(crate) time: SimTime,
    pub(crate) signals: &'a [SimSignalState],
    pub(crate) changed: &'a BTreeSet<SimSignalId>,
    pub(crate) pending: &'a mut Vec<ScheduledDrive>,
}

impl ProcessContext<'_> {
    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// Returns the current value of a signal.
    pub fn value(&self, signal: SimSignalId) -> &LogicVec {
        &self.signals[signal.index()].value
    }

    /// Returns bit 0 of a signal.
    pub fn logic(&self, signal: SimSignalId) -> Logic {
        self.signals[signal.index()].logic()
    }

    /// Returns true if the signal changed in this delta cycle.
    pub fn changed(&self, signal: SimSignalId) -> bool {
        self.changed.contains(&signal)
    }

    /// Returns the transition bit 0 made in this delta cycle, if any.
    ///
    /// Only clean `0 <-> 1` transitions count; anything involving X or Z is
    /// not an edge.
    pub fn edge(&self, signal: SimSignalId) -> Option<Edge> {
        if !self.changed(signal) {
            return None;
        }
        let state = &self.signals[signal.index()];
        match (state.previous_value.get(0), state.value.get(0)) {
            (Logic::Zero, Logic::One) => Some(Edge::Rising),
            (Logic::One, Logic::Zero) => Some(Edge::Falling),
            _ => None,
        }
    }

    /// Schedules a driver update for the next delta cycle.
    pub fn drive(&mut self, driver: DriverId, value: LogicVec) {
        self.drive_after(driver, value, 0);
    }

    /// Schedules a driver update `delay_fs` femtoseconds from now.
    pub fn drive_after(&mut self, driver: DriverId, value: LogicVec, delay_fs: u64) {
        self.pending.push(ScheduledDrive {
            driver,
            value,
            delay_fs,
        });
    }
}
