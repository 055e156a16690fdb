//! Error types for test execution.

use regbench_config::ConfigError;
use regbench_i2c::I2cError;
use regbench_sim::{SimError, SimTime};

/// Why a test case failed.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// Data read back from the DUT differs from what was expected.
    #[error("assertion failed at {time}: expected {expected:02x?}, read {actual:02x?}")]
    AssertionFailed {
        /// The expected bytes.
        expected: Vec<u8>,
        /// The bytes actually read.
        actual: Vec<u8>,
        /// Simulation time of the comparison.
        time: SimTime,
    },

    /// A bus transaction failed.
    #[error("I2C error: {0}")]
    I2c(#[from] I2cError),

    /// The simulation kernel failed.
    #[error("simulation error: {0}")]
    Sim(#[from] SimError),

    /// The bench configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
