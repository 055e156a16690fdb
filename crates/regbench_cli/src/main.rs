//! regbench CLI, runs the I2C register round-trip testbench.
//!
//! Provides `regbench run` for running the registered test cases against the
//! simulated DUT and `regbench list` for showing what is registered.

#![warn(missing_docs)]

mod list;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// regbench: simulated I2C register testbench.
#[derive(Parser, Debug)]
#[command(name = "regbench", version, about = "I2C register round-trip testbench")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to a custom `regbench.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the registered test cases.
    Run(RunArgs),
    /// List the registered test cases.
    List,
}

/// Arguments for the `regbench run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Specific test name to run (optional).
    pub name: Option<String>,

    /// Substring filter for test names.
    #[arg(long)]
    pub filter: Option<String>,

    /// Random seed for every selected test (overrides `bench.seed`).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a VCD waveform per test into the configured directory.
    #[arg(long)]
    pub waveform: bool,

    /// Write a JSON report of all outcomes to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Number of `-v` flags given.
    pub verbose: u8,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::List => list::run(),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over `-v`.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(global.quiet, global.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn log_level(quiet: bool, verbose: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
