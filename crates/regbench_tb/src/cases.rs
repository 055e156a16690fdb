//! Registered test cases.

use rand::Rng;
use tracing::info;

use regbench_dut::SCRATCH_LEN;

use crate::env::Testbench;
use crate::error::TestError;

/// Signature of a test case body.
pub type TestFn = fn(&mut Testbench) -> Result<(), TestError>;

/// A named test case.
#[derive(Clone, Copy)]
pub struct TestCase {
    /// Name used for selection and reporting.
    pub name: &'static str,
    /// One-line summary shown by `regbench list`.
    pub description: &'static str,
    /// The test body.
    pub run: TestFn,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase").field("name", &self.name).finish()
    }
}

static TESTS: [TestCase; 2] = [
    TestCase {
        name: "test_project",
        description: "write a random byte to register 0 over I2C and read it back",
        run: test_project,
    },
    TestCase {
        name: "test_scratch_sweep",
        description: "write random bytes to every scratch register and read them back",
        run: test_scratch_sweep,
    },
];

/// Returns every registered test case in run order.
pub fn registry() -> &'static [TestCase] {
    &TESTS
}

/// Looks up a test case by exact name.
pub fn find_test(name: &str) -> Option<&'static TestCase> {
    TESTS.iter().find(|case| case.name == name)
}

/// Brings the DUT out of reset with every input at its idle level.
fn bring_up(tb: &mut Testbench) -> Result<(), TestError> {
    tb.default_pin_drive()?;
    tb.assert_reset()?;
    tb.release_reset()
}

/// Writes a random byte to register 0 and checks that it reads back.
pub fn test_project(tb: &mut Testbench) -> Result<(), TestError> {
    info!("Start");
    bring_up(tb)?;

    let slave = tb.target_address();
    let data0: u8 = tb.rng().gen();

    tb.i2c_write(slave, 0, data0)?;
    let reg0 = tb.i2c_read(slave, 0)?;

    tb.check_bytes(&[data0], &reg0)
}

/// Fills every scratch register with random data, then reads each back.
pub fn test_scratch_sweep(tb: &mut Testbench) -> Result<(), TestError> {
    info!("Start");
    bring_up(tb)?;

    let slave = tb.target_address();
    let mut expected = [0u8; SCRATCH_LEN];
    tb.rng().fill(&mut expected[..]);

    for (register, &data) in (0u8..).zip(expected.iter()) {
        tb.i2c_write(slave, register, data)?;
    }
    for (register, &data) in (0u8..).zip(expected.iter()) {
        let actual = tb.i2c_read(slave, register)?;
        tb.check_bytes(&[data], &actual)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let names: Vec<_> = registry().iter().map(|case| case.name).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert_eq!(names[0], "test_project");
    }

    #[test]
    fn find_by_exact_name() {
        assert!(find_test("test_project").is_some());
        assert!(find_test("test_proj").is_none());
    }
}
