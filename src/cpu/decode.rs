//! Instruction records and operand classification.
//!
//! An instruction is four bytes: an opcode byte and three operand bytes
//! holding whatever was typed after the mnemonic. The operand bytes carry no
//! tag; their addressing mode is recovered at dispatch time:
//! - `R` followed by one or two digits is a register reference (0-99)
//! - a leading digit starts a literal of up to three digits (0-999)
//! - anything else is an opaque three-byte payload
//!
//! Unused operand bytes are stored as NUL.

use crate::cpu::opcode::{Opcode, opcode_to_mnemonic};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Number of bytes per persisted instruction.
pub const RECORD_SIZE: usize = 4;

/// A stored instruction record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Instruction {
    /// Raw opcode byte (see [`Opcode`]).
    pub opcode: u8,
    /// Operand bytes `d1, d2, d3`.
    pub operands: [u8; 3],
}

/// A classified operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register index 0-99.
    RegisterRef(u8),
    /// Literal value 0-999.
    Literal(u16),
    /// Bytes to be consumed verbatim.
    Opaque([u8; 3]),
}

impl Instruction {
    /// The end-of-program record.
    pub const EMPTY: Instruction = Instruction { opcode: 0, operands: [0; 3] };

    /// Create an instruction from an opcode and raw operand bytes.
    pub const fn new(opcode: Opcode, operands: [u8; 3]) -> Self {
        Self { opcode: opcode as u8, operands }
    }

    /// Create an instruction without operands.
    pub const fn bare(opcode: Opcode) -> Self {
        Self::new(opcode, [0; 3])
    }

    /// Create an instruction with a left-aligned decimal literal.
    ///
    /// # Panics
    /// Panics if `value` does not fit in three digits.
    pub fn with_literal(opcode: Opcode, value: u16) -> Self {
        assert!(value <= 999, "literal {} out of range (0-999)", value);
        let mut operands = [0u8; 3];
        for (slot, digit) in operands.iter_mut().zip(value.to_string().bytes()) {
            *slot = digit;
        }
        Self::new(opcode, operands)
    }

    /// Create an instruction referencing register `index` as `R<digits>`.
    ///
    /// # Panics
    /// Panics if `index` is not a valid register.
    pub fn with_register(opcode: Opcode, index: u8) -> Self {
        assert!(index < 100, "register R{} out of range (0-99)", index);
        let mut operands = [b'R', 0, 0];
        for (slot, digit) in operands[1..].iter_mut().zip(index.to_string().bytes()) {
            *slot = digit;
        }
        Self::new(opcode, operands)
    }

    /// Decode the opcode byte.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode)
    }

    /// True for the end-of-program record.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opcode == Opcode::Empty as u8
    }

    /// True if this is the given opcode.
    #[inline]
    pub fn is(&self, opcode: Opcode) -> bool {
        self.opcode == opcode as u8
    }

    /// Classify the operand bytes.
    pub fn operand(&self) -> Operand {
        classify(self)
    }

    /// Serialize in persisted order `d1 d2 d3 opcode`.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let [d1, d2, d3] = self.operands;
        [d1, d2, d3, self.opcode]
    }

    /// Deserialize from persisted order `d1 d2 d3 opcode`.
    pub fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self {
            opcode: bytes[3],
            operands: [bytes[0], bytes[1], bytes[2]],
        }
    }

    /// Operand bytes with NUL shown as blank.
    pub fn operand_text(&self) -> [u8; 3] {
        self.operands.map(blank_nul)
    }
}

impl std::fmt::Debug for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Instruction({} {:?})", self, self.operands)
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mnemonic = opcode_to_mnemonic(self.opcode);
        let text: String = mnemonic
            .iter()
            .chain(b" ".iter())
            .chain(self.operand_text().iter())
            .map(|&b| b as char)
            .collect();
        write!(f, "{}", text.trim_end())
    }
}

/// Determine the addressing mode of an instruction's operand bytes.
pub fn classify(instr: &Instruction) -> Operand {
    let [d1, d2, d3] = instr.operands;

    if d1 == b'R' {
        return match (digit(d2), digit(d3)) {
            (Some(tens), Some(ones)) => Operand::RegisterRef(tens * 10 + ones),
            (Some(ones), None) => Operand::RegisterRef(ones),
            _ => Operand::Opaque(instr.operands),
        };
    }

    match digit(d1) {
        Some(a) => {
            let value = match (digit(d2), digit(d3)) {
                (Some(b), Some(c)) => a as u16 * 100 + b as u16 * 10 + c as u16,
                (Some(b), None) => a as u16 * 10 + b as u16,
                (None, _) => a as u16,
            };
            Operand::Literal(value)
        }
        None => Operand::Opaque(instr.operands),
    }
}

/// Decode an instruction into its opcode and classified operand.
pub fn decode(instr: &Instruction) -> Result<(Opcode, Operand), DecodeError> {
    let opcode = instr
        .opcode()
        .ok_or(DecodeError::UnknownOpcode(instr.opcode))?;
    Ok((opcode, classify(instr)))
}

/// Render a number as three decimal digits.
///
/// Values above 999 keep their lowest three digits.
pub fn number_to_digits(value: u16) -> [u8; 3] {
    let value = value % 1000;
    [
        b'0' + (value / 100) as u8,
        b'0' + (value / 10 % 10) as u8,
        b'0' + (value % 10) as u8,
    ]
}

#[inline]
fn digit(b: u8) -> Option<u8> {
    b.is_ascii_digit().then(|| b - b'0')
}

#[inline]
fn blank_nul(b: u8) -> u8 {
    if b == 0 { b' ' } else { b }
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode byte {0}")]
    UnknownOpcode(u8),
}
