//! Controller machine state.
//!
//! The controller has:
//! - 100 general registers, 16 bits each, wrapping on overflow
//! - a register pointer selecting the register single-operand
//!   instructions act on (set by `PIC`)
//! - the program cursor (position of the next instruction)
//! - the output cursor (next display column written by `PTR`/`PCH`)

use serde::{Serialize, Deserialize};

/// Number of general registers.
pub const REGISTER_COUNT: usize = 100;

/// The register file and cursors.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    values: Vec<u16>,
    /// Index of the register selected by `PIC`.
    pub pointer: u8,
    /// Position of the next instruction to fetch.
    pub cursor: usize,
    /// Next display column for character output.
    pub output: usize,
}

impl Registers {
    /// Create a register file with everything zeroed.
    pub fn new() -> Self {
        Self {
            values: vec![0; REGISTER_COUNT],
            pointer: 0,
            cursor: 0,
            output: 0,
        }
    }

    /// Zero all registers, the pointer and both cursors.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0);
        self.pointer = 0;
        self.cursor = 0;
        self.output = 0;
    }

    /// Read register `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid register.
    #[inline]
    pub fn get(&self, index: u8) -> u16 {
        assert!((index as usize) < REGISTER_COUNT, "register R{} out of range (0-99)", index);
        self.values[index as usize]
    }

    /// Write register `index`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid register.
    #[inline]
    pub fn set(&mut self, index: u8, value: u16) {
        assert!((index as usize) < REGISTER_COUNT, "register R{} out of range (0-99)", index);
        self.values[index as usize] = value;
    }

    /// Select the register single-operand instructions act on.
    ///
    /// # Panics
    /// Panics if `index` is not a valid register.
    pub fn point(&mut self, index: u8) {
        assert!((index as usize) < REGISTER_COUNT, "register R{} out of range (0-99)", index);
        self.pointer = index;
    }

    /// Value of the pointed register.
    #[inline]
    pub fn pointed(&self) -> u16 {
        self.get(self.pointer)
    }

    /// Overwrite the pointed register.
    #[inline]
    pub fn set_pointed(&mut self, value: u16) {
        self.set(self.pointer, value);
    }

    /// Add to the pointed register (wrapping).
    pub fn add_pointed(&mut self, value: u16) {
        let result = self.pointed().wrapping_add(value);
        self.set_pointed(result);
    }

    /// Subtract from the pointed register (wrapping).
    pub fn sub_pointed(&mut self, value: u16) {
        let result = self.pointed().wrapping_sub(value);
        self.set_pointed(result);
    }

    /// Advance the program cursor by one.
    /// Returns the old value.
    pub fn advance(&mut self) -> usize {
        let old = self.cursor;
        self.cursor += 1;
        old
    }

    /// Set the program cursor to an absolute position.
    pub fn jump(&mut self, pos: usize) {
        self.cursor = pos;
    }

    /// All register values.
    pub fn values(&self) -> &[u16] {
        &self.values
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero registers
        let non_zero: Vec<_> = self
            .values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0)
            .map(|(i, v)| format!("R{}={}", i, v))
            .collect();

        f.debug_struct("Registers")
            .field("pointer", &self.pointer)
            .field("cursor", &self.cursor)
            .field("output", &self.output)
            .field("non_zero", &non_zero)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        for i in 0..REGISTER_COUNT as u8 {
            regs.set(i, i as u16 + 1);
        }
        regs.point(42);
        regs.cursor = 17;
        regs.output = 5;

        regs.reset();

        assert!(regs.values().iter().all(|&v| v == 0));
        assert_eq!(regs.pointer, 0);
        assert_eq!(regs.cursor, 0);
        assert_eq!(regs.output, 0);
    }

    #[test]
    fn test_wrapping_arithmetic() {
        let mut regs = Registers::new();
        regs.sub_pointed(1);
        assert_eq!(regs.pointed(), u16::MAX);
        regs.add_pointed(2);
        assert_eq!(regs.pointed(), 1);
    }

    #[test]
    fn test_pointer_selects_register() {
        let mut regs = Registers::new();
        regs.point(7);
        regs.set_pointed(300);
        assert_eq!(regs.get(7), 300);
        assert_eq!(regs.get(0), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_register_bounds() {
        let regs = Registers::new();
        regs.get(100);
    }

    #[test]
    fn test_advance() {
        let mut regs = Registers::new();
        regs.cursor = 10;

        let old = regs.advance();
        assert_eq!(old, 10);
        assert_eq!(regs.cursor, 11);
    }
}
