//! The testbench environment and the steps test cases are built from.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use regbench_common::{Logic, LogicVec};
use regbench_config::BenchConfig;
use regbench_dut::{data_in_idle, Dut};
use regbench_i2c::I2cMaster;
use regbench_sim::{vcd_file_recorder, DriveStrength, DriverId, SimKernel, SimSummary, SimTime};

use crate::error::TestError;

/// Drivers the bench holds on the DUT's input pins.
#[derive(Debug, Clone, Copy)]
struct PinDrivers {
    rstb: DriverId,
    ready: DriverId,
    data_in: DriverId,
    scl_in: DriverId,
    sda_in: DriverId,
}

/// One simulation of the DUT plus everything a test needs to stimulate it.
pub struct Testbench {
    kernel: SimKernel,
    dut: Dut,
    drivers: PinDrivers,
    master: I2cMaster,
    rng: StdRng,
    seed: u64,
    reset_hold_fs: u64,
    scope: String,
}

impl Testbench {
    /// Builds a fresh environment from `config`, seeding the random
    /// generator with `seed`.
    pub fn new(config: &BenchConfig, seed: u64) -> Result<Self, TestError> {
        let mut kernel = SimKernel::new();
        kernel.set_time_limit(config.time_limit_fs()?);

        let dut = Dut::build(&mut kernel, config.target.address)?;
        let pins = dut.pins();
        let drivers = PinDrivers {
            rstb: kernel.add_driver(pins.rstb, DriveStrength::Strong),
            ready: kernel.add_driver(pins.ready, DriveStrength::Strong),
            data_in: kernel.add_driver(pins.data_in, DriveStrength::Strong),
            scl_in: kernel.add_driver(pins.scl_in, DriveStrength::Strong),
            sda_in: kernel.add_driver(pins.sda_in, DriveStrength::Strong),
        };
        let speed = config.bus_speed()?;
        let master = I2cMaster::new(&mut kernel, pins.i2c_sda, pins.i2c_scl, speed)
            .with_stretch_timeout(config.stretch_timeout_fs()?);

        info!(seed, speed = %master.speed(), "testbench ready");
        Ok(Self {
            kernel,
            dut,
            drivers,
            master,
            rng: StdRng::seed_from_u64(seed),
            seed,
            reset_hold_fs: config.reset_hold_fs()?,
            scope: config.bench.name.clone(),
        })
    }

    /// Dumps every DUT pin into a VCD file at `path` from now on.
    pub fn record_waveform(&mut self, path: &Path) -> Result<(), TestError> {
        let recorder = vcd_file_recorder(path)?;
        self.kernel.attach_recorder(recorder, &self.scope)?;
        info!(path = %path.display(), "recording waveform");
        Ok(())
    }

    /// Returns the simulation kernel.
    pub fn kernel(&self) -> &SimKernel {
        &self.kernel
    }

    /// Returns the simulation kernel for direct pin manipulation.
    pub fn kernel_mut(&mut self) -> &mut SimKernel {
        &mut self.kernel
    }

    /// Returns the device under test.
    pub fn dut(&self) -> &Dut {
        &self.dut
    }

    /// Returns the seeded random generator.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Returns the seed this environment was built with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the I2C address of the DUT's register target.
    pub fn target_address(&self) -> u8 {
        self.dut.address()
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.kernel.current_time()
    }

    /// Drives the idle level on every input pin, with reset asserted.
    pub fn default_pin_drive(&mut self) -> Result<(), TestError> {
        info!("Drive default values for peripheral interfaces and reset");

        // Start in reset
        self.kernel.drive(self.drivers.rstb, LogicVec::from(Logic::Zero))?;

        self.kernel.drive(self.drivers.ready, LogicVec::from(Logic::One))?;
        self.kernel.drive(self.drivers.data_in, data_in_idle())?;
        self.kernel.drive(self.drivers.scl_in, LogicVec::from(Logic::One))?;
        self.kernel.drive(self.drivers.sda_in, LogicVec::from(Logic::One))?;
        Ok(())
    }

    /// Holds reset low for the configured hold time.
    pub fn assert_reset(&mut self) -> Result<(), TestError> {
        info!("Asserting reset");
        self.kernel.drive(self.drivers.rstb, LogicVec::from(Logic::Zero))?;
        self.kernel.advance(self.reset_hold_fs)?;
        Ok(())
    }

    /// Releases reset and waits the configured hold time.
    pub fn release_reset(&mut self) -> Result<(), TestError> {
        info!("Releasing reset");
        self.kernel.drive(self.drivers.rstb, LogicVec::from(Logic::One))?;
        self.kernel.advance(self.reset_hold_fs)?;
        Ok(())
    }

    /// Writes `data` to register `address` of `slave`, then STOP.
    pub fn i2c_write(&mut self, slave: u8, address: u8, data: u8) -> Result<(), TestError> {
        info!("I2C write to address {address} data {data}");
        self.master.write(&mut self.kernel, slave, &[address, data])?;
        self.master.send_stop(&mut self.kernel)?;
        Ok(())
    }

    /// Reads one byte from register `address` of `slave`.
    ///
    /// The register pointer is set by a write, then read back through a
    /// repeated START, then STOP.
    pub fn i2c_read(&mut self, slave: u8, address: u8) -> Result<Vec<u8>, TestError> {
        info!("I2C read to address {address}");
        self.master.write(&mut self.kernel, slave, &[address])?;
        let data = self.master.read(&mut self.kernel, slave, 1)?;
        self.master.send_stop(&mut self.kernel)?;
        Ok(data)
    }

    /// Fails with [`TestError::AssertionFailed`] unless the bytes match.
    pub fn check_bytes(&self, expected: &[u8], actual: &[u8]) -> Result<(), TestError> {
        if expected == actual {
            return Ok(());
        }
        Err(TestError::AssertionFailed {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            time: self.time(),
        })
    }

    /// Settles the kernel, flushes the waveform, and returns run statistics.
    pub fn finish(mut self) -> Result<SimSummary, TestError> {
        Ok(self.kernel.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regbench_common::FS_PER_US;

    fn bench() -> Testbench {
        Testbench::new(&BenchConfig::default(), 1).unwrap()
    }

    #[test]
    fn default_pin_drive_sets_idle_levels() {
        let mut tb = bench();
        tb.default_pin_drive().unwrap();
        tb.kernel_mut().settle().unwrap();
        let pins = tb.dut().pins();
        let k = tb.kernel();
        assert_eq!(k.logic(pins.rstb), Logic::Zero);
        assert_eq!(k.logic(pins.ready), Logic::One);
        assert_eq!(k.value(pins.data_in).to_string(), "111111111");
        assert_eq!(k.logic(pins.scl_in), Logic::One);
        assert_eq!(k.logic(pins.sda_in), Logic::One);
        assert_eq!(k.logic(pins.i2c_scl), Logic::One);
        assert_eq!(k.logic(pins.i2c_sda), Logic::One);
    }

    #[test]
    fn reset_steps_take_the_hold_time() {
        let mut tb = bench();
        tb.default_pin_drive().unwrap();
        tb.assert_reset().unwrap();
        assert_eq!(tb.time().fs, FS_PER_US);
        tb.release_reset().unwrap();
        assert_eq!(tb.time().fs, 2 * FS_PER_US);
        assert_eq!(tb.kernel().logic(tb.dut().pins().rstb), Logic::One);
    }

    #[test]
    fn write_read_round_trip() {
        let mut tb = bench();
        tb.default_pin_drive().unwrap();
        tb.assert_reset().unwrap();
        tb.release_reset().unwrap();
        let slave = tb.target_address();
        tb.i2c_write(slave, 0, 0xC3).unwrap();
        assert_eq!(tb.dut().peek(0), Some(0xC3));
        let data = tb.i2c_read(slave, 0).unwrap();
        tb.check_bytes(&[0xC3], &data).unwrap();
    }

    #[test]
    fn bus_access_in_reset_is_nacked() {
        let mut tb = bench();
        tb.default_pin_drive().unwrap();
        tb.assert_reset().unwrap();
        let err = tb.i2c_write(0x70, 0, 1).unwrap_err();
        assert!(matches!(err, TestError::I2c(_)));
    }

    #[test]
    fn check_bytes_reports_mismatch() {
        let tb = bench();
        let err = tb.check_bytes(&[1], &[2]).unwrap_err();
        assert!(matches!(
            err,
            TestError::AssertionFailed { ref expected, ref actual, .. }
                if expected == &[1] && actual == &[2]
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = BenchConfig::default();
        config.bus.speed = "slow".to_string();
        assert!(matches!(
            Testbench::new(&config, 0),
            Err(TestError::Config(_))
        ));
    }

    #[test]
    fn time_limit_aborts_long_runs() {
        let mut config = BenchConfig::default();
        config.bench.time_limit = "10us".to_string();
        let mut tb = Testbench::new(&config, 0).unwrap();
        tb.default_pin_drive().unwrap();
        tb.assert_reset().unwrap();
        tb.release_reset().unwrap();
        let err = tb.i2c_write(0x70, 0, 1).unwrap_err();
        assert!(matches!(
            err,
            TestError::I2c(regbench_i2c::I2cError::Sim(
                regbench_sim::SimError::TimeLimitExceeded { .. }
            ))
        ));
    }
}
