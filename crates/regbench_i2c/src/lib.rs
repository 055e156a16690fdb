//! Bit-banged I2C bus master for regbench simulations.
//!
//! [`I2cMaster`] drives the SCL and SDA nets of a [`SimKernel`] as open-drain
//! outputs: it only ever pulls a line low or releases it, and relies on the
//! pull-ups attached to the nets for the high level. Every bus operation
//! advances simulated time, so device processes run while the master waits.
//!
//! [`SimKernel`]: regbench_sim::SimKernel

#![warn(missing_docs)]

pub mod error;
pub mod master;

pub use error::I2cError;
pub use master::{Direction, I2cMaster};
