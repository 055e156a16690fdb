//! `regbench run`: run the registered test cases.
//!
//! Loads the bench configuration, filters the registered cases by name,
//! then runs each in a fresh simulation. Reports per-test pass/fail status,
//! a summary line, and optionally a JSON report.

use std::path::Path;

use tracing::debug;

use regbench_config::BenchConfig;
use regbench_tb::{filter_tests, registry, resolve_seed, run_test, RunReport, TestOutcome};

use crate::{GlobalArgs, RunArgs};

/// Runs the `regbench run` command.
///
/// Returns exit code 0 if all selected tests pass, 1 if any fail.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = load_bench_config(global)?;

    if !global.quiet {
        eprintln!("   Testing {}", config.bench.name);
    }

    let cases = filter_tests(registry(), args.name.as_deref(), args.filter.as_deref());
    if cases.is_empty() {
        if !global.quiet {
            eprintln!("warning: no tests match the given filter");
        }
        return Ok(0);
    }

    if !global.quiet {
        eprintln!("   Found {} test(s)", cases.len());
    }

    let record_waveform = args.waveform || config.waveform.enabled;
    let mut outcomes = Vec::new();

    for case in cases {
        let seed = resolve_seed(args.seed, &config);
        let waveform_path =
            record_waveform.then(|| config.waveform.dir.join(format!("{}.vcd", case.name)));

        debug!(test = case.name, seed, "running");
        let outcome = run_test(case, &config, seed, waveform_path.as_deref());

        if !global.quiet {
            print_test_result(&outcome);
        }
        outcomes.push(outcome);
    }

    let report = RunReport::new(&config.bench.name, outcomes);

    if !global.quiet {
        eprintln!();
        eprintln!(
            "   Result: {} passed, {} failed out of {} test(s)",
            report.passed,
            report.failed,
            report.outcomes.len()
        );
    }

    if let Some(path) = &args.report {
        report.write_json(path)?;
        if !global.quiet {
            eprintln!("   Report written to {}", path.display());
        }
    }

    Ok(if report.all_passed() { 0 } else { 1 })
}

/// Loads `--config` if given, else `regbench.toml` from the current
/// directory, else the defaults.
fn load_bench_config(global: &GlobalArgs) -> Result<BenchConfig, regbench_config::ConfigError> {
    match &global.config {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            regbench_config::load_config_file(path)
        }
        None => {
            debug!("loading config from the current directory");
            regbench_config::load_config_or_default(Path::new("."))
        }
    }
}

/// Prints the result of a single test run.
fn print_test_result(outcome: &TestOutcome) {
    if outcome.passed {
        eprintln!(
            "   PASS  {name} ({time})",
            name = outcome.name,
            time = outcome.sim_time,
        );
    } else {
        eprintln!(
            "   FAIL  {name}: {err} (seed {seed})",
            name = outcome.name,
            err = outcome.error.as_deref().unwrap_or("unknown error"),
            seed = outcome.seed,
        );
    }
}
