//! The I2C target front end of the peripheral.
//!
//! [`I2cTarget`] is a kernel [`Process`] sensitive to the bus nets and the
//! reset and input pins. It samples SDA on SCL rising edges and only changes
//! its own SDA driver right after SCL falling edges, so it never produces a
//! START or STOP by accident.

use std::cell::RefCell;
use std::rc::Rc;

use regbench_common::{Logic, LogicVec};
use regbench_sim::{DriverId, Edge, Process, ProcessContext, SimError, SimSignalId};

use crate::registers::{PinSnapshot, RegisterFile};
use crate::DutPins;

/// Where the target is within a bus transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Not addressed; waiting for a START.
    Idle,
    /// Shifting in the address byte.
    Address,
    /// Driving the ACK for our address.
    AddressAck,
    /// Shifting in a byte written by the master.
    WriteByte,
    /// Driving the ACK or NACK for a written byte.
    WriteAck,
    /// Shifting out a register byte.
    ReadByte,
    /// Waiting for the master's ACK or NACK.
    ReadAck,
}

/// Behavioral I2C register target.
pub struct I2cTarget {
    address: u8,
    pins: DutPins,
    sda_driver: DriverId,
    registers: Rc<RefCell<RegisterFile>>,
    in_reset: bool,
    phase: Phase,
    shift: u8,
    bit_count: u8,
    reading: bool,
    pointer: u8,
    pointer_loaded: bool,
    tx_byte: u8,
    tx_bit: u8,
    master_acked: bool,
}

impl I2cTarget {
    /// Creates a target answering at the 7-bit `address`.
    pub fn new(
        address: u8,
        pins: DutPins,
        sda_driver: DriverId,
        registers: Rc<RefCell<RegisterFile>>,
    ) -> Self {
        Self {
            address,
            pins,
            sda_driver,
            registers,
            in_reset: true,
            phase: Phase::Idle,
            shift: 0,
            bit_count: 0,
            reading: false,
            pointer: 0,
            pointer_loaded: false,
            tx_byte: 0,
            tx_bit: 0,
            master_acked: false,
        }
    }

    /// Signals the target reacts to.
    pub fn sensitivity(pins: &DutPins) -> [SimSignalId; 3] {
        [pins.rstb, pins.i2c_scl, pins.i2c_sda]
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::trace!(from = ?self.phase, to = ?phase, "i2c target phase");
            self.phase = phase;
        }
    }

    fn release(&self, ctx: &mut ProcessContext<'_>) {
        ctx.drive(self.sda_driver, LogicVec::from(Logic::Z));
    }

    fn pull_low(&self, ctx: &mut ProcessContext<'_>) {
        ctx.drive(self.sda_driver, LogicVec::from(Logic::Zero));
    }

    fn drive_bit(&self, ctx: &mut ProcessContext<'_>, bit: bool) {
        if bit {
            self.release(ctx);
        } else {
            self.pull_low(ctx);
        }
    }

    fn snapshot(&self, ctx: &ProcessContext<'_>) -> PinSnapshot {
        let data = ctx.value(self.pins.data_in);
        let data_in = (0..data.width().min(16))
            .filter(|&bit| data.get(bit) == Logic::One)
            .fold(0u16, |acc, bit| acc | 1 << bit);
        PinSnapshot {
            data_in,
            ready: PinSnapshot::bit(ctx.logic(self.pins.ready)),
            scl_in: PinSnapshot::bit(ctx.logic(self.pins.scl_in)),
            sda_in: PinSnapshot::bit(ctx.logic(self.pins.sda_in)),
        }
    }

    /// Loads `reg[pointer]` and drives its MSB.
    fn load_tx_byte(&mut self, ctx: &mut ProcessContext<'_>) {
        let pins = self.snapshot(ctx);
        self.tx_byte = self.registers.borrow().read(self.pointer, &pins);
        tracing::trace!(pointer = self.pointer, value = self.tx_byte, "register read");
        self.pointer = self.pointer.wrapping_add(1);
        self.tx_bit = 7;
        self.drive_bit(ctx, self.tx_byte & 0x80 != 0);
        self.set_phase(Phase::ReadByte);
    }

    fn begin_byte(&mut self, phase: Phase) {
        self.shift = 0;
        self.bit_count = 0;
        self.set_phase(phase);
    }

    /// Handles a completed byte written by the master. Returns the ACK.
    fn accept_written_byte(&mut self) -> bool {
        let byte = self.shift;
        if !self.pointer_loaded {
            self.pointer = byte;
            self.pointer_loaded = true;
            return true;
        }
        let accepted = self.registers.borrow_mut().write(self.pointer, byte);
        tracing::trace!(pointer = self.pointer, value = byte, accepted, "register write");
        if accepted {
            self.pointer = self.pointer.wrapping_add(1);
        }
        accepted
    }

    fn on_rising(&mut self, sda: Logic) {
        if self.phase == Phase::Idle {
            return;
        }
        let Some(bit) = sda.to_bool() else {
            tracing::trace!(level = %sda, "undefined SDA sampled, dropping transaction");
            self.set_phase(Phase::Idle);
            return;
        };
        match self.phase {
            Phase::Address | Phase::WriteByte if self.bit_count < 8 => {
                self.shift = (self.shift << 1) | u8::from(bit);
                self.bit_count += 1;
            }
            Phase::ReadAck => self.master_acked = !bit,
            _ => {}
        }
    }

    fn on_falling(&mut self, ctx: &mut ProcessContext<'_>) {
        match self.phase {
            Phase::Address if self.bit_count == 8 => {
                if self.shift >> 1 == self.address {
                    self.reading = self.shift & 1 == 1;
                    self.pull_low(ctx);
                    self.set_phase(Phase::AddressAck);
                } else {
                    self.set_phase(Phase::Idle);
                }
            }
            Phase::WriteByte if self.bit_count == 8 => {
                if self.accept_written_byte() {
                    self.pull_low(ctx);
                }
                self.set_phase(Phase::WriteAck);
            }
            Phase::AddressAck if self.reading => self.load_tx_byte(ctx),
            Phase::AddressAck => {
                self.pointer_loaded = false;
                self.release(ctx);
                self.begin_byte(Phase::WriteByte);
            }
            Phase::WriteAck => {
                self.release(ctx);
                self.begin_byte(Phase::WriteByte);
            }
            Phase::ReadByte if self.tx_bit == 0 => {
                self.release(ctx);
                self.set_phase(Phase::ReadAck);
            }
            Phase::ReadByte => {
                self.tx_bit -= 1;
                self.drive_bit(ctx, (self.tx_byte >> self.tx_bit) & 1 == 1);
            }
            Phase::ReadAck if self.master_acked => self.load_tx_byte(ctx),
            Phase::ReadAck => self.set_phase(Phase::Idle),
            _ => {}
        }
    }
}

impl Process for I2cTarget {
    fn name(&self) -> &str {
        "i2c_target"
    }

    fn evaluate(&mut self, ctx: &mut ProcessContext<'_>) -> Result<(), SimError> {
        if ctx.logic(self.pins.rstb) != Logic::One {
            if !self.in_reset {
                tracing::trace!(time = %ctx.time(), "i2c target reset");
                self.in_reset = true;
                self.registers.borrow_mut().reset();
                self.pointer = 0;
                self.set_phase(Phase::Idle);
                self.release(ctx);
            }
            return Ok(());
        }
        self.in_reset = false;

        let scl = ctx.logic(self.pins.i2c_scl);
        let sda = ctx.logic(self.pins.i2c_sda);

        if scl == Logic::One && !ctx.changed(self.pins.i2c_scl) {
            match ctx.edge(self.pins.i2c_sda) {
                Some(Edge::Falling) => {
                    tracing::trace!(time = %ctx.time(), "START");
                    self.release(ctx);
                    self.begin_byte(Phase::Address);
                    return Ok(());
                }
                Some(Edge::Rising) => {
                    tracing::trace!(time = %ctx.time(), "STOP");
                    self.release(ctx);
                    self.set_phase(Phase::Idle);
                    return Ok(());
                }
                None => {}
            }
        }

        match ctx.edge(self.pins.i2c_scl) {
            Some(Edge::Rising) => self.on_rising(sda),
            Some(Edge::Falling) => self.on_falling(ctx),
            None => {}
        }
        Ok(())
    }
}
