//! Error types for I2C bus transactions.

use regbench_common::Logic;
use regbench_sim::{SimError, SimTime};

/// Errors that can occur while the master runs a bus transaction.
#[derive(Debug, thiserror::Error)]
pub enum I2cError {
    /// The addressed device did not acknowledge a byte.
    ///
    /// `byte_index` 0 is the address byte; payload bytes count from 1.
    #[error("no ACK from device {address:#04x} on byte {byte_index}")]
    Nack {
        /// The 7-bit device address.
        address: u8,
        /// Position of the unacknowledged byte in the transaction.
        byte_index: usize,
    },

    /// The address does not fit in 7 bits.
    #[error("invalid 7-bit address {0:#04x}")]
    InvalidAddress(u8),

    /// A device held SCL low for longer than the stretch timeout.
    #[error("SCL held low for more than {timeout_fs} fs")]
    ClockStretchTimeout {
        /// The stretch timeout in femtoseconds.
        timeout_fs: u64,
    },

    /// SDA read neither `0` nor `1` when sampled.
    #[error("SDA is {level} at {time}")]
    UndefinedLevel {
        /// The level that was sampled.
        level: Logic,
        /// When it was sampled.
        time: SimTime,
    },

    /// The simulation kernel failed underneath the transaction.
    #[error(transparent)]
    Sim(#[from] SimError),
}
