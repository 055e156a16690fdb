//! Event-driven pin-level simulator for regbench testbenches.
//!
//! This crate implements a delta-cycle simulation kernel with 4-state logic,
//! per-bit multi-driver resolution (so open-drain buses with pull-ups behave
//! like the real thing), edge-sensitive device processes, and VCD waveform
//! output.
//!
//! # Architecture
//!
//! The testbench owns a [`SimKernel`] and drives it sequentially. Device
//! models implement [`Process`] and are evaluated whenever a signal in their
//! sensitivity list changes. Every write, from the testbench or a process,
//! goes through a [`DriverId`] and lands in a later delta cycle.
//!
//! # Usage
//!
//! ```ignore
//! use regbench_sim::{DriveStrength, SimKernel};
//!
//! let mut kernel = SimKernel::new();
//! let rstb = kernel.add_signal("rstb", 1)?;
//! let drv = kernel.add_driver(rstb, DriveStrength::Strong);
//! kernel.drive(drv, LogicVec::from_bool(false))?;
//! kernel.advance(FS_PER_US)?;
//! ```
//!
//! # Modules
//!
//! - `error` - Simulation error types
//! - `time` - Femtosecond-precision time with delta cycles
//! - `value` - Signal state, drivers, drive-strength resolution
//! - `process` - Device process trait and evaluation context
//! - `kernel` - Event queue and delta-cycle loop
//! - `waveform` - Waveform recording (VCD format)

#![warn(missing_docs)]

pub mod error;
pub mod kernel;
pub mod process;
pub mod time;
pub mod value;
pub mod waveform;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub use error::SimError;
pub use kernel::{SimKernel, SimSummary, StepResult};
pub use process::{Edge, Process, ProcessContext};
pub use time::SimTime;
pub use value::{DriveStrength, Driver, DriverId, SimSignalId, SimSignalState};
pub use waveform::{VcdRecorder, WaveformRecorder};

/// Creates a buffered VCD recorder writing to `path`.
///
/// Parent directories are created as needed.
pub fn vcd_file_recorder(path: &Path) -> Result<Box<dyn WaveformRecorder>, SimError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    Ok(Box::new(VcdRecorder::new(BufWriter::new(file))))
}
