//! The peripheral's register file.

use regbench_common::Logic;

/// Number of read/write scratch registers at `0x00..=0x0F`.
pub const SCRATCH_LEN: usize = 16;
/// Read-only mirror of `data_in[7:0]`.
pub const REG_DATA_IN: u8 = 0x10;
/// Read-only pin status: bit 0 `ready`, bit 1 `scl_in`, bit 2 `sda_in`,
/// bit 3 `data_in[8]`.
pub const REG_STATUS: u8 = 0x11;
/// Value returned for unmapped addresses.
pub const UNMAPPED_VALUE: u8 = 0xFF;

/// Input pin levels captured when a read-only register is read.
///
/// Anything other than a definite `1` reads as `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PinSnapshot {
    /// `data_in[8:0]`, bit 8 in position 8.
    pub data_in: u16,
    /// `ready`.
    pub ready: bool,
    /// `scl_in`.
    pub scl_in: bool,
    /// `sda_in`.
    pub sda_in: bool,
}

impl PinSnapshot {
    pub(crate) fn bit(level: Logic) -> bool {
        level == Logic::One
    }
}

/// Scratch registers plus the read-only input mirrors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterFile {
    scratch: [u8; SCRATCH_LEN],
}

impl RegisterFile {
    /// Creates a register file in its reset state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every scratch register.
    pub fn reset(&mut self) {
        self.scratch = [0; SCRATCH_LEN];
    }

    /// Reads a register, sampling the input mirrors from `pins`.
    pub fn read(&self, address: u8, pins: &PinSnapshot) -> u8 {
        match address {
            a if (a as usize) < SCRATCH_LEN => self.scratch[a as usize],
            REG_DATA_IN => (pins.data_in & 0xFF) as u8,
            REG_STATUS => {
                u8::from(pins.ready)
                    | u8::from(pins.scl_in) << 1
                    | u8::from(pins.sda_in) << 2
                    | u8::from(pins.data_in & 0x100 != 0) << 3
            }
            _ => UNMAPPED_VALUE,
        }
    }

    /// Writes a register. Returns `false` for read-only or unmapped
    /// addresses, which leave the file untouched.
    pub fn write(&mut self, address: u8, value: u8) -> bool {
        match self.scratch.get_mut(address as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Returns a scratch register without going through the bus.
    pub fn peek(&self, address: u8) -> Option<u8> {
        self.scratch.get(address as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle_pins() -> PinSnapshot {
        PinSnapshot {
            data_in: 0x1FF,
            ready: true,
            scl_in: true,
            sda_in: true,
        }
    }

    #[test]
    fn scratch_registers_are_read_write() {
        let mut regs = RegisterFile::new();
        assert!(regs.write(0x00, 0xA5));
        assert!(regs.write(0x0F, 0x3C));
        assert_eq!(regs.read(0x00, &idle_pins()), 0xA5);
        assert_eq!(regs.read(0x0F, &idle_pins()), 0x3C);
        assert_eq!(regs.peek(0x0F), Some(0x3C));
    }

    #[test]
    fn read_only_and_unmapped_writes_are_refused() {
        let mut regs = RegisterFile::new();
        assert!(!regs.write(REG_DATA_IN, 0));
        assert!(!regs.write(REG_STATUS, 0));
        assert!(!regs.write(0x80, 0));
        assert_eq!(regs, RegisterFile::new());
    }

    #[test]
    fn input_mirrors() {
        let regs = RegisterFile::new();
        assert_eq!(regs.read(REG_DATA_IN, &idle_pins()), 0xFF);
        assert_eq!(regs.read(REG_STATUS, &idle_pins()), 0x0F);

        let pins = PinSnapshot {
            data_in: 0x0A5,
            ready: false,
            scl_in: true,
            sda_in: false,
        };
        assert_eq!(regs.read(REG_DATA_IN, &pins), 0xA5);
        assert_eq!(regs.read(REG_STATUS, &pins), 0b0010);
    }

    #[test]
    fn unmapped_reads_all_ones() {
        let regs = RegisterFile::new();
        assert_eq!(regs.read(0x12, &idle_pins()), UNMAPPED_VALUE);
        assert_eq!(regs.read(0xFF, &idle_pins()), UNMAPPED_VALUE);
        assert_eq!(regs.peek(0x12), None);
    }

    #[test]
    fn reset_clears_scratch() {
        let mut regs = RegisterFile::new();
        regs.write(3, 9);
        regs.reset();
        assert_eq!(regs.peek(3), Some(0));
    }
}
