//! `regbench list`: print the registered test cases.

use regbench_tb::registry;

/// Prints one line per registered test case.
pub fn run() -> Result<i32, Box<dyn std::error::Error>> {
    let width = registry().iter().map(|case| case.name.len()).max().unwrap_or(0);
    for case in registry() {
        println!("{:<width$}  {}", case.name, case.description);
    }
    Ok(0)
}
