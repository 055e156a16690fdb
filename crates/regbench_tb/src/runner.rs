//! Test selection, execution, and reporting.
//!
//! Every test runs in its own [`Testbench`], so no state leaks between
//! cases. A failing case never stops the run; its error is captured in the
//! [`TestOutcome`].

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use tracing::{info, info_span, warn};

use regbench_config::BenchConfig;
use regbench_sim::SimTime;

use crate::cases::TestCase;
use crate::env::Testbench;
use crate::error::TestError;

/// Result of running a single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    /// Name of the test case.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Seed the test's random generator was built with.
    pub seed: u64,
    /// Simulated time when the test ended.
    pub sim_time: SimTime,
    /// Error message if the test failed.
    pub error: Option<String>,
}

/// Summary of a whole run, written as the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Bench name from the configuration.
    pub bench: String,
    /// Number of passing tests.
    pub passed: usize,
    /// Number of failing tests.
    pub failed: usize,
    /// Per-test outcomes in run order.
    pub outcomes: Vec<TestOutcome>,
}

impl RunReport {
    /// Tallies a list of outcomes.
    pub fn new(bench: &str, outcomes: Vec<TestOutcome>) -> Self {
        let passed = outcomes.iter().filter(|o| o.passed).count();
        Self {
            bench: bench.to_string(),
            passed,
            failed: outcomes.len() - passed,
            outcomes,
        }
    }

    /// Returns true if no test failed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Writes the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Filters test cases by exact name and/or substring.
///
/// If `name` is provided, only the case with that exact name is returned.
/// If `filter` is provided, only cases whose name contains the substring
/// are returned. If both are `None`, every case is returned.
pub fn filter_tests<'a>(
    cases: &'a [TestCase],
    name: Option<&str>,
    filter: Option<&str>,
) -> Vec<&'a TestCase> {
    cases
        .iter()
        .filter(|case| {
            if let Some(n) = name {
                return case.name == n;
            }
            if let Some(f) = filter {
                return case.name.contains(f);
            }
            true
        })
        .collect()
}

/// Picks the seed for one test: an explicit override first, then the
/// configured seed, then a fresh random one.
pub fn resolve_seed(cli_seed: Option<u64>, config: &BenchConfig) -> u64 {
    cli_seed
        .or(config.bench.seed)
        .unwrap_or_else(rand::random)
}

/// Runs one test case in a fresh environment.
///
/// When `waveform` is set, the whole run is dumped there as VCD.
pub fn run_test(
    case: &TestCase,
    config: &BenchConfig,
    seed: u64,
    waveform: Option<&Path>,
) -> TestOutcome {
    let span = info_span!("test", name = case.name);
    let _guard = span.enter();
    info!(seed, "running");

    let mut tb = match Testbench::new(config, seed) {
        Ok(tb) => tb,
        Err(e) => return failed(case, seed, SimTime::zero(), &e),
    };
    if let Some(path) = waveform {
        if let Err(e) = tb.record_waveform(path) {
            return failed(case, seed, tb.time(), &e);
        }
    }

    let result = (case.run)(&mut tb);
    let stop_time = tb.time();
    let summary = tb.finish();

    match (result, summary) {
        (Ok(()), Ok(summary)) => {
            info!(time = %summary.final_time, deltas = summary.total_deltas, "passed");
            TestOutcome {
                name: case.name.to_string(),
                passed: true,
                seed,
                sim_time: summary.final_time,
                error: None,
            }
        }
        (Err(e), _) | (Ok(()), Err(e)) => failed(case, seed, stop_time, &e),
    }
}

fn failed(case: &TestCase, seed: u64, time: SimTime, err: &TestError) -> TestOutcome {
    warn!(%time, seed, "failed: {err}");
    TestOutcome {
        name: case.name.to_string(),
        passed: false,
        seed,
        sim_time: time,
        error: Some(err.to_string()),
    }
}
