//! Shared foundational types for the regbench workspace.
//!
//! This crate provides 4-state logic values, packed logic vectors, bus
//! frequencies, and duration parsing used by the simulator, the I2C master,
//! the device model, and the configuration loader.

#![warn(missing_docs)]

pub mod duration;
pub mod frequency;
pub mod logic;
pub mod logic_vec;

pub use duration::{
    parse_duration, ParseDurationError, FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US,
};
pub use frequency::{Frequency, ParseFrequencyError};
pub use logic::Logic;
pub use logic_vec::LogicVec;
