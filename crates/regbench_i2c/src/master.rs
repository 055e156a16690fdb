//! The I2C bus master.
//!
//! Bit timing divides one SCL period into four quarters. SDA only changes in
//! the middle of the low phase, and the master samples in the middle of the
//! high phase:
//!
//! ```text
//!        |  q  |  q  |  q  |  q  |
//! SCL  __|___________/‾‾‾‾‾‾‾‾‾‾‾\___
//! SDA  ==X===== bit ==========@======
//!          set         sample
//! ```

use regbench_common::{Frequency, Logic, LogicVec, FS_PER_MS};
use regbench_sim::{DriveStrength, DriverId, SimError, SimKernel, SimSignalId};

use crate::error::I2cError;

/// Data direction carried in the R/W bit of the address byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Master transmits (`R/W = 0`).
    Write,
    /// Master receives (`R/W = 1`).
    Read,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::Write => 0,
            Direction::Read => 1,
        }
    }
}

/// A bit-banged I2C master attached to two open-drain nets.
#[derive(Debug)]
pub struct I2cMaster {
    sda: SimSignalId,
    scl: SimSignalId,
    sda_driver: DriverId,
    scl_driver: DriverId,
    speed: Frequency,
    quarter_fs: u64,
    stretch_timeout_fs: u64,
    bus_active: bool,
}

impl I2cMaster {
    /// Attaches a master to the `sda` and `scl` nets.
    ///
    /// Both drivers start released. The nets need pull-ups for the bus to
    /// idle high.
    pub fn new(kernel: &mut SimKernel, sda: SimSignalId, scl: SimSignalId, speed: Frequency) -> Self {
        let sda_driver = kernel.add_driver(sda, DriveStrength::Strong);
        let scl_driver = kernel.add_driver(scl, DriveStrength::Strong);
        Self {
            sda,
            scl,
            sda_driver,
            scl_driver,
            speed,
            quarter_fs: (speed.period_fs() / 4).max(1),
            stretch_timeout_fs: FS_PER_MS,
            bus_active: false,
        }
    }

    /// Sets how long a device may hold SCL low before the master gives up.
    pub fn with_stretch_timeout(mut self, timeout_fs: u64) -> Self {
        self.stretch_timeout_fs = timeout_fs;
        self
    }

    /// Returns the bus clock frequency.
    pub fn speed(&self) -> Frequency {
        self.speed
    }

    /// Returns true between a START and the matching STOP.
    pub fn is_bus_active(&self) -> bool {
        self.bus_active
    }

    /// Issues a START condition, or a repeated START if the bus is active.
    pub fn send_start(&mut self, kernel: &mut SimKernel) -> Result<(), I2cError> {
        if self.bus_active {
            tracing::debug!(time = %kernel.current_time(), "repeated START");
            self.release(kernel, self.sda_driver)?;
            kernel.advance(self.quarter_fs)?;
            self.release_scl(kernel)?;
            kernel.advance(self.quarter_fs)?;
        } else {
            tracing::debug!(time = %kernel.current_time(), "START");
            self.release(kernel, self.sda_driver)?;
            self.release_scl(kernel)?;
            kernel.advance(self.quarter_fs)?;
        }

        self.pull_low(kernel, self.sda_driver)?;
        kernel.advance(self.quarter_fs)?;
        self.pull_low(kernel, self.scl_driver)?;
        kernel.advance(self.quarter_fs)?;
        self.bus_active = true;
        Ok(())
    }

    /// Issues a STOP condition. Does nothing while the bus is idle.
    pub fn send_stop(&mut self, kernel: &mut SimKernel) -> Result<(), I2cError> {
        if !self.bus_active {
            return Ok(());
        }
        tracing::debug!(time = %kernel.current_time(), "STOP");
        self.pull_low(kernel, self.sda_driver)?;
        kernel.advance(self.quarter_fs)?;
        self.release_scl(kernel)?;
        kernel.advance(self.quarter_fs)?;
        self.release(kernel, self.sda_driver)?;
        kernel.advance(self.quarter_fs)?;
        self.bus_active = false;
        Ok(())
    }

    /// Starts a write transaction to `address` and sends `payload`.
    ///
    /// The bus is left active; finish with [`send_stop`](Self::send_stop) or
    /// continue with a repeated START.
    pub fn write(
        &mut self,
        kernel: &mut SimKernel,
        address: u8,
        payload: &[u8],
    ) -> Result<(), I2cError> {
        self.start_transaction(kernel, address, Direction::Write)?;
        for (index, &byte) in payload.iter().enumerate() {
            if !self.write_byte(kernel, byte)? {
                return Err(I2cError::Nack {
                    address,
                    byte_index: index + 1,
                });
            }
        }
        tracing::debug!(address, ?payload, "write complete");
        Ok(())
    }

    /// Starts a read transaction from `address` and receives `length` bytes.
    ///
    /// Every byte but the last is acknowledged; the last is NACKed to tell
    /// the device the transfer is over. A zero-length read touches nothing.
    pub fn read(
        &mut self,
        kernel: &mut SimKernel,
        address: u8,
        length: usize,
    ) -> Result<Vec<u8>, I2cError> {
        if length == 0 {
            return Ok(Vec::new());
        }
        self.start_transaction(kernel, address, Direction::Read)?;
        let mut data = Vec::with_capacity(length);
        for index in 0..length {
            let ack = index + 1 < length;
            data.push(self.read_byte(kernel, ack)?);
        }
        tracing::debug!(address, ?data, "read complete");
        Ok(data)
    }

    fn start_transaction(
        &mut self,
        kernel: &mut SimKernel,
        address: u8,
        direction: Direction,
    ) -> Result<(), I2cError> {
        if address > 0x7F {
            return Err(I2cError::InvalidAddress(address));
        }
        self.send_start(kernel)?;
        if !self.write_byte(kernel, (address << 1) | direction.bit())? {
            return Err(I2cError::Nack {
                address,
                byte_index: 0,
            });
        }
        Ok(())
    }

    /// Sends one byte MSB first and returns whether the device ACKed it.
    fn write_byte(&mut self, kernel: &mut SimKernel, byte: u8) -> Result<bool, I2cError> {
        for bit in (0..8).rev() {
            self.write_bit(kernel, (byte >> bit) & 1 == 1)?;
        }
        let nack = self.read_bit(kernel)?;
        Ok(!nack)
    }

    fn read_byte(&mut self, kernel: &mut SimKernel, ack: bool) -> Result<u8, I2cError> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.read_bit(kernel)?);
        }
        self.write_bit(kernel, !ack)?;
        Ok(byte)
    }

    fn write_bit(&mut self, kernel: &mut SimKernel, bit: bool) -> Result<(), I2cError> {
        if bit {
            self.release(kernel, self.sda_driver)?;
        } else {
            self.pull_low(kernel, self.sda_driver)?;
        }
        self.clock_pulse(kernel)?;
        Ok(())
    }

    fn read_bit(&mut self, kernel: &mut SimKernel) -> Result<bool, I2cError> {
        self.release(kernel, self.sda_driver)?;
        self.clock_pulse(kernel)
    }

    /// Runs one SCL period starting from the low phase and returns SDA as
    /// sampled in the middle of the high phase.
    fn clock_pulse(&mut self, kernel: &mut SimKernel) -> Result<bool, I2cError> {
        kernel.advance(self.quarter_fs)?;
        self.release_scl(kernel)?;
        kernel.advance(self.quarter_fs)?;
        let level = kernel.logic(self.sda);
        let bit = level.to_bool().ok_or(I2cError::UndefinedLevel {
            level,
            time: kernel.current_time(),
        })?;
        kernel.advance(self.quarter_fs)?;
        self.pull_low(kernel, self.scl_driver)?;
        kernel.advance(self.quarter_fs)?;
        Ok(bit)
    }

    /// Releases SCL and waits for it to read high, honouring clock stretching.
    fn release_scl(&mut self, kernel: &mut SimKernel) -> Result<(), I2cError> {
        self.release(kernel, self.scl_driver)?;
        match kernel.wait_for_logic(self.scl, Logic::One, self.stretch_timeout_fs) {
            Ok(_) => Ok(()),
            Err(SimError::WaitTimeout { .. }) => Err(I2cError::ClockStretchTimeout {
                timeout_fs: self.stretch_timeout_fs,
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn pull_low(&self, kernel: &mut SimKernel, driver: DriverId) -> Result<(), SimError> {
        kernel.drive(driver, LogicVec::from_bool(false))
    }

    fn release(&self, kernel: &mut SimKernel, driver: DriverId) -> Result<(), SimError> {
        kernel.drive(driver, LogicVec::filled(1, Logic::Z))
    }
}
