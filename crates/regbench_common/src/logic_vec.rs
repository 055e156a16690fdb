//! Packed vectors of 4-state logic values for multi-bit pins and buses.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector of 4-state [`Logic`] values packed 2 bits per value.
///
/// Index 0 is the least significant bit. Textual forms (parsing and
/// `Display`) are written most significant bit first, so `"100"` has bit 2 set.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    /// Packed storage: 2 bits per logic value, 32 values per u64.
    data: Vec<u64>,
}

/// Number of logic values packed per u64 word.
const VALUES_PER_WORD: u32 = 32;

impl LogicVec {
    /// Creates a new `LogicVec` of the given width, initialized to all `Zero`.
    pub fn new(width: u32) -> Self {
        Self {
            width,
            data: vec![0; word_count(width)],
        }
    }

    /// Creates a `LogicVec` with every bit set to `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut v = Self::new(width);
        if value != Logic::Zero {
            for i in 0..width {
                v.set(i, value);
            }
        }
        v
    }

    /// Returns the number of logic values in this vector.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Gets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        Logic::from_bits(self.data[word_idx] >> bit_offset)
    }

    /// Sets the logic value at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        assert!(
            index < self.width,
            "index {index} out of bounds for width {}",
            self.width
        );
        let word_idx = (index / VALUES_PER_WORD) as usize;
        let bit_offset = (index % VALUES_PER_WORD) * 2;
        let mask = !(0b11u64 << bit_offset);
        self.data[word_idx] = (self.data[word_idx] & mask) | ((value as u64) << bit_offset);
    }

    /// Creates a single-bit `LogicVec` from a boolean value.
    pub fn from_bool(value: bool) -> Self {
        Self::filled(1, Logic::from(value))
    }

    /// Creates a `LogicVec` from a `u64` value with the given width.
    ///
    /// Bits beyond the given width are ignored.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        for i in 0..width.min(64) {
            if (value >> i) & 1 != 0 {
                v.set(i, Logic::One);
            }
        }
        v
    }

    /// Converts the vector to a `u64` if every bit is `Zero` or `One`.
    ///
    /// Returns `None` if any bit is X or Z, or if the width exceeds 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        let mut result = 0u64;
        for i in 0..self.width {
            if self.get(i).to_bool()? {
                result |= 1 << i;
            }
        }
        Some(result)
    }

    /// Returns true if no bit is X or Z.
    pub fn is_fully_defined(&self) -> bool {
        (0..self.width).all(|i| self.get(i).is_definite())
    }

    /// Returns true if every bit is Z.
    pub fn is_all_z(&self) -> bool {
        (0..self.width).all(|i| self.get(i) == Logic::Z)
    }

    /// Parses a binary string like `"111111111"` or `"10XZ"`.
    ///
    /// The leftmost character is the most significant bit (highest index).
    /// Underscores are accepted as digit separators. Returns `None` if the
    /// string is empty or contains other characters.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let digits: Vec<char> = s.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return None;
        }
        let mut v = Self::new(digits.len() as u32);
        for (i, c) in digits.iter().rev().enumerate() {
            v.set(i as u32, Logic::from_char(*c)?);
        }
        Some(v)
    }
}

impl From<Logic> for LogicVec {
    fn from(value: Logic) -> Self {
        Self::filled(1, value)
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get(i))?;
        }
        Ok(())
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicVec({self})")
    }
}

/// Returns the number of u64 words needed to store `width` logic values.
fn word_count(width: u32) -> usize {
    width.div_ceil(VALUES_PER_WORD) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_all_states() {
        let mut v = LogicVec::new(4);
        v.set(0, Logic::Zero);
        v.set(1, Logic::One);
        v.set(2, Logic::X);
        v.set(3, Logic::Z);
        assert_eq!(v.get(0), Logic::Zero);
        assert_eq!(v.get(1), Logic::One);
        assert_eq!(v.get(2), Logic::X);
        assert_eq!(v.get(3), Logic::Z);
    }

    #[test]
    fn default_pin_pattern_parses_as_nine_ones() {
        let v = LogicVec::from_binary_str("111111111").unwrap();
        assert_eq!(v.width(), 9);
        assert_eq!(v.to_u64(), Some(0x1FF));
    }

    #[test]
    fn from_binary_str_msb_first() {
        let v = LogicVec::from_binary_str("10XZ").unwrap();
        assert_eq!(v.get(3), Logic::One);
        assert_eq!(v.get(2), Logic::Zero);
        assert_eq!(v.get(1), Logic::X);
        assert_eq!(v.get(0), Logic::Z);
    }

    #[test]
    fn from_binary_str_with_separators() {
        let v = LogicVec::from_binary_str("1010_0101").unwrap();
        assert_eq!(v.to_u64(), Some(0xA5));
    }

    #[test]
    fn from_binary_str_rejects_garbage() {
        assert!(LogicVec::from_binary_str("10A1").is_none());
        assert!(LogicVec::from_binary_str("").is_none());
    }

    #[test]
    fn to_u64_requires_definite_bits() {
        assert_eq!(LogicVec::from_u64(0x5A, 8).to_u64(), Some(0x5A));
        let v = LogicVec::from_binary_str("1X01").unwrap();
        assert_eq!(v.to_u64(), None);
        assert!(!v.is_fully_defined());
    }

    #[test]
    fn from_u64_truncates_to_width() {
        let v = LogicVec::from_u64(0x1FF, 8);
        assert_eq!(v.to_u64(), Some(0xFF));
    }

    #[test]
    fn filled_and_all_z() {
        let z = LogicVec::filled(3, Logic::Z);
        assert!(z.is_all_z());
        assert_eq!(z.to_string(), "ZZZ");
        assert!(!LogicVec::from_bool(true).is_all_z());
    }

    #[test]
    fn wide_vector_spans_words() {
        let mut v = LogicVec::new(100);
        v.set(0, Logic::One);
        v.set(50, Logic::X);
        v.set(99, Logic::Z);
        assert_eq!(v.get(0), Logic::One);
        assert_eq!(v.get(50), Logic::X);
        assert_eq!(v.get(99), Logic::Z);
        assert_eq!(v.get(1), Logic::Zero);
        assert_eq!(v.to_u64(), None);
    }

    #[test]
    fn from_logic_is_single_bit() {
        let v = LogicVec::from(Logic::One);
        assert_eq!(v.width(), 1);
        assert_eq!(format!("{v:?}"), "LogicVec(1)");
    }

    #[test]
    fn serde_roundtrip() {
        let v = LogicVec::from_binary_str("10XZ1010").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
