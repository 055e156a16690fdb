//! Simulation error types.
//!
//! All errors that can occur while building or running a simulation are
//! represented as variants of [`SimError`].

use std::io;

use regbench_common::Logic;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A signal with the same name was already registered.
    #[error("duplicate signal '{name}'")]
    DuplicateSignal {
        /// The conflicting signal name.
        name: String,
    },

    /// A signal name could not be resolved.
    #[error("unknown signal '{name}'")]
    UnknownSignal {
        /// The name that was looked up.
        name: String,
    },

    /// A value of the wrong width was driven onto a signal.
    #[error("width mismatch on '{signal}': expected {expected} bits, got {actual}")]
    WidthMismatch {
        /// The signal being driven.
        signal: String,
        /// The signal's declared width.
        expected: u32,
        /// The width of the driven value.
        actual: u32,
    },

    /// A signal did not reach the awaited level before the timeout.
    #[error("timed out at {time_fs} fs waiting for '{signal}' to become {level}")]
    WaitTimeout {
        /// The awaited signal.
        signal: String,
        /// The awaited level.
        level: Logic,
        /// Time in femtoseconds when the wait gave up.
        time_fs: u64,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// The simulation was asked to run past its configured time limit.
    #[error("time limit exceeded: {limit_fs} fs")]
    TimeLimitExceeded {
        /// The time limit in femtoseconds.
        limit_fs: u64,
    },

    /// Too many delta cycles at a single time step, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time in femtoseconds where the limit was hit.
        fs: u64,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },
}
