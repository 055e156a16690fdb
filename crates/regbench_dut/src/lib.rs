//! Behavioral model of the device under test.
//!
//! The design exposes an active-low reset, a `ready` strobe, a 9-bit
//! `data_in` bus, two spare input pins, and an I2C register peripheral on
//! the open-drain nets `i2c_scl` and `i2c_sda`. [`Dut::build`] declares all
//! of those on a [`SimKernel`], attaches the bus pull-ups, and registers the
//! [`I2cTarget`] process.
//!
//! # Register map
//!
//! | address | access | contents |
//! |---|---|---|
//! | `0x00..=0x0F` | R/W | scratch, cleared by reset |
//! | `0x10` | R | `data_in[7:0]` |
//! | `0x11` | R | `{data_in[8], sda_in, scl_in, ready}` |
//! | others | R | `0xFF` |

#![warn(missing_docs)]

pub mod registers;
pub mod target;

use std::cell::RefCell;
use std::rc::Rc;

use regbench_common::LogicVec;
use regbench_sim::{DriveStrength, SimError, SimKernel, SimSignalId};

pub use registers::{PinSnapshot, RegisterFile, REG_DATA_IN, REG_STATUS, SCRATCH_LEN};
pub use target::{I2cTarget, Phase};

/// Width of the `data_in` bus.
pub const DATA_IN_WIDTH: u32 = 9;

/// Signal IDs of every DUT port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutPins {
    /// Active-low reset.
    pub rstb: SimSignalId,
    /// Ready strobe.
    pub ready: SimSignalId,
    /// 9-bit parallel input.
    pub data_in: SimSignalId,
    /// Spare SCL input pin.
    pub scl_in: SimSignalId,
    /// Spare SDA input pin.
    pub sda_in: SimSignalId,
    /// Open-drain I2C clock net.
    pub i2c_scl: SimSignalId,
    /// Open-drain I2C data net.
    pub i2c_sda: SimSignalId,
}

/// A DUT instance living inside a kernel.
#[derive(Debug, Clone)]
pub struct Dut {
    pins: DutPins,
    address: u8,
    registers: Rc<RefCell<RegisterFile>>,
}

impl Dut {
    /// Declares the DUT ports on `kernel` and registers its I2C target at
    /// the 7-bit `address`.
    ///
    /// Input pins start undriven (`X`); the bus nets idle high through their
    /// pull-ups once the kernel settles.
    pub fn build(kernel: &mut SimKernel, address: u8) -> Result<Self, SimError> {
        let pins = DutPins {
            rstb: kernel.add_signal("rstb", 1)?,
            ready: kernel.add_signal("ready", 1)?,
            data_in: kernel.add_signal("data_in", DATA_IN_WIDTH)?,
            scl_in: kernel.add_signal("scl_in", 1)?,
            sda_in: kernel.add_signal("sda_in", 1)?,
            i2c_scl: kernel.add_signal("i2c_scl", 1)?,
            i2c_sda: kernel.add_signal("i2c_sda", 1)?,
        };
        kernel.add_pullup(pins.i2c_scl);
        kernel.add_pullup(pins.i2c_sda);

        let registers = Rc::new(RefCell::new(RegisterFile::new()));
        let sda_driver = kernel.add_driver(pins.i2c_sda, DriveStrength::Strong);
        let target = I2cTarget::new(address, pins, sda_driver, Rc::clone(&registers));
        kernel.add_process(Box::new(target), &I2cTarget::sensitivity(&pins));
        tracing::debug!(address, "DUT built");

        Ok(Self {
            pins,
            address,
            registers,
        })
    }

    /// Returns the DUT's ports.
    pub fn pins(&self) -> DutPins {
        self.pins
    }

    /// Returns the I2C address the target answers at.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Reads a scratch register directly, bypassing the bus.
    pub fn peek(&self, register: u8) -> Option<u8> {
        self.registers.borrow().peek(register)
    }
}

/// Returns the value driven on `data_in` when the bench idles.
pub fn data_in_idle() -> LogicVec {
    LogicVec::from_u64(0x1FF, DATA_IN_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regbench_common::{Frequency, Logic, FS_PER_US};
    use regbench_i2c::{I2cError, I2cMaster};
    use regbench_sim::DriverId;

    struct Bench {
        kernel: SimKernel,
        dut: Dut,
        rstb: DriverId,
        master: I2cMaster,
    }

    fn bench() -> Bench {
        let mut kernel = SimKernel::new();
        let dut = Dut::build(&mut kernel, 0x70).unwrap();
        let pins = dut.pins();
        let inputs = [
            (pins.ready, LogicVec::from_bool(true)),
            (pins.data_in, LogicVec::from_u64(0x1A5, DATA_IN_WIDTH)),
            (pins.scl_in, LogicVec::from_bool(false)),
            (pins.sda_in, LogicVec::from_bool(true)),
        ];
        for (signal, value) in inputs {
            let driver = kernel.add_driver(signal, DriveStrength::Strong);
            kernel.drive(driver, value).unwrap();
        }
        let rstb = kernel.add_driver(pins.rstb, DriveStrength::Strong);
        kernel.drive(rstb, LogicVec::from_bool(false)).unwrap();
        kernel.advance(FS_PER_US).unwrap();
        kernel.drive(rstb, LogicVec::from_bool(true)).unwrap();
        kernel.advance(FS_PER_US).unwrap();

        let master = I2cMaster::new(
            &mut kernel,
            pins.i2c_sda,
            pins.i2c_scl,
            Frequency::FAST_MODE,
        );
        Bench {
            kernel,
            dut,
            rstb,
            master,
        }
    }

    fn read_register(b: &mut Bench, register: u8) -> Result<u8, I2cError> {
        b.master.write(&mut b.kernel, 0x70, &[register])?;
        let data = b.master.read(&mut b.kernel, 0x70, 1)?;
        b.master.send_stop(&mut b.kernel)?;
        Ok(data[0])
    }

    #[test]
    fn build_declares_ports_and_pulls_bus_high() {
        let mut kernel = SimKernel::new();
        let dut = Dut::build(&mut kernel, 0x70).unwrap();
        kernel.settle().unwrap();
        let pins = dut.pins();
        assert_eq!(kernel.find_signal("data_in").unwrap(), pins.data_in);
        assert_eq!(kernel.value(pins.data_in).width(), DATA_IN_WIDTH);
        assert_eq!(kernel.logic(pins.i2c_scl), Logic::One);
        assert_eq!(kernel.logic(pins.i2c_sda), Logic::One);
        assert_eq!(kernel.logic(pins.rstb), Logic::X);
        assert_eq!(dut.address(), 0x70);
        assert!(Dut::build(&mut kernel, 0x71).is_err());
    }

    #[test]
    fn write_then_read_scratch_register() {
        let mut b = bench();
        b.master.write(&mut b.kernel, 0x70, &[0x00, 0x5A]).unwrap();
        b.master.send_stop(&mut b.kernel).unwrap();
        assert_eq!(b.dut.peek(0x00), Some(0x5A));
        assert_eq!(read_register(&mut b, 0x00).unwrap(), 0x5A);
    }

    #[test]
    fn pointer_auto_increments() {
        let mut b = bench();
        b.master
            .write(&mut b.kernel, 0x70, &[0x04, 0x11, 0x22, 0x33])
            .unwrap();
        b.master.send_stop(&mut b.kernel).unwrap();
        assert_eq!(b.dut.peek(0x05), Some(0x22));

        b.master.write(&mut b.kernel, 0x70, &[0x04]).unwrap();
        let data = b.master.read(&mut b.kernel, 0x70, 3).unwrap();
        b.master.send_stop(&mut b.kernel).unwrap();
        assert_eq!(data, vec![0x11, 0x22, 0x33]);
    }

    #[test]
    fn input_mirrors_read_pin_levels() {
        let mut b = bench();
        assert_eq!(read_register(&mut b, REG_DATA_IN).unwrap(), 0xA5);
        // data_in[8]=1, sda_in=1, scl_in=0, ready=1
        assert_eq!(read_register(&mut b, REG_STATUS).unwrap(), 0b1101);
        assert_eq!(read_register(&mut b, 0x40).unwrap(), 0xFF);
    }

    #[test]
    fn write_to_read_only_register_is_nacked() {
        let mut b = bench();
        let err = b
            .master
            .write(&mut b.kernel, 0x70, &[REG_DATA_IN, 0x00])
            .unwrap_err();
        assert!(matches!(
            err,
            I2cError::Nack {
                address: 0x70,
                byte_index: 2
            }
        ));
        b.master.send_stop(&mut b.kernel).unwrap();
    }

    #[test]
    fn other_addresses_are_ignored() {
        let mut b = bench();
        let err = b.master.write(&mut b.kernel, 0x71, &[0x00]).unwrap_err();
        assert!(matches!(err, I2cError::Nack { byte_index: 0, .. }));
        b.master.send_stop(&mut b.kernel).unwrap();
        assert_eq!(read_register(&mut b, 0x00).unwrap(), 0x00);
    }

    #[test]
    fn reset_clears_registers_and_silences_target() {
        let mut b = bench();
        b.master.write(&mut b.kernel, 0x70, &[0x02, 0x99]).unwrap();
        b.master.send_stop(&mut b.kernel).unwrap();
        assert_eq!(b.dut.peek(0x02), Some(0x99));

        b.kernel.drive(b.rstb, LogicVec::from_bool(false)).unwrap();
        b.kernel.advance(FS_PER_US).unwrap();
        assert_eq!(b.dut.peek(0x02), Some(0x00));
        let err = b.master.write(&mut b.kernel, 0x70, &[0x02]).unwrap_err();
        assert!(matches!(err, I2cError::Nack { byte_index: 0, .. }));
    }
}
