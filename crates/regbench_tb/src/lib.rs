//! Testbench for the I2C register peripheral.
//!
//! A [`Testbench`] owns one simulation: the kernel, the DUT, the drivers on
//! the DUT's input pins, the I2C master, and a seeded random generator. Test
//! cases are plain functions over a testbench; the [`runner`] builds a fresh
//! environment for every case and collects [`TestOutcome`]s.
//!
//! # Modules
//!
//! - `error` - [`TestError`]
//! - `env` - the [`Testbench`] environment and its steps
//! - `cases` - registered test cases
//! - `runner` - filtering, seeding, running, and the JSON report

#![warn(missing_docs)]

pub mod cases;
pub mod env;
pub mod error;
pub mod runner;

pub use cases::{find_test, registry, TestCase, TestFn};
pub use env::Testbench;
pub use error::TestError;
pub use runner::{filter_tests, resolve_seed, run_test, RunReport, TestOutcome};
