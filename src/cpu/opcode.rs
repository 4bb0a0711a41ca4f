//! Opcode identifiers and the mnemonic table.
//!
//! Every instruction the controller understands has a stable byte value (the
//! value persisted in program storage) and a three-character mnemonic typed
//! on the keyboard. Both the editor and the dispatcher go through this table,
//! so adding an instruction means adding a variant, a table row and a
//! handler arm in the dispatcher.

use serde::{Serialize, Deserialize};

/// What kind of operand an opcode expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// `R` followed by one or two digits.
    Register,
    /// One to three decimal digits.
    Literal,
    /// Bytes are used verbatim (or ignored).
    Any,
}

/// Opcode identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// End of program.
    Empty = 0,
    /// Point the register pointer at a register.
    Pic,
    /// Set the pointed register to a literal.
    Set,
    /// Increment the pointed register by a literal.
    Inc,
    /// Decrement the pointed register by a literal.
    Dec,
    /// Copy the pointed register into another register.
    Cop,
    /// Add a register to the pointed register.
    Add,
    /// Subtract a register from the pointed register.
    Sub,
    /// Condition: pointed register smaller than register.
    Sma,
    /// Condition: pointed register bigger than register.
    Big,
    /// Condition: registers equal.
    Req,
    /// Condition: registers not equal.
    Rnq,
    /// Condition: pointed register equals literal.
    Veq,
    /// Condition: pointed register differs from literal.
    Vnq,
    /// Reserved analog output.
    Aou,
    /// Reserved digital output.
    Dou,
    /// Condition: analog channel above pointed register.
    Anh,
    /// Condition: analog channel not above pointed register.
    Anl,
    /// Store an analog channel in the pointed register.
    Sva,
    /// Condition: digital input high.
    Inh,
    /// Condition: digital input low.
    Inl,
    /// Buzzer tone.
    Ton,
    /// Print a register as three digits.
    Ptr,
    /// Print three characters.
    Pch,
    /// Clear the screen.
    Clr,
    /// Block begin marker.
    Beg,
    /// Block end marker.
    End,
    /// Wait in tenths of a second.
    Wai,
    /// Save the current position into a register.
    Spo,
    /// Jump to the position stored in a register.
    Jpo,
    /// Jump to a literal position.
    Jum,
    /// Left LED colour.
    Ld1,
    /// Right LED colour.
    Ld2,
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeEntry {
    pub opcode: Opcode,
    pub mnemonic: [u8; 3],
    pub operand: OperandKind,
}

const fn entry(opcode: Opcode, mnemonic: &[u8; 3], operand: OperandKind) -> OpcodeEntry {
    OpcodeEntry { opcode, mnemonic: *mnemonic, operand }
}

/// The opcode table. Lookups scan it front to back; first match wins.
pub const OPCODE_TABLE: [OpcodeEntry; 33] = [
    entry(Opcode::Empty, b"   ", OperandKind::Any),
    entry(Opcode::Pic, b"PIC", OperandKind::Register),
    entry(Opcode::Set, b"SET", OperandKind::Literal),
    entry(Opcode::Inc, b"INC", OperandKind::Literal),
    entry(Opcode::Dec, b"DEC", OperandKind::Literal),
    entry(Opcode::Cop, b"COP", OperandKind::Register),
    entry(Opcode::Add, b"ADD", OperandKind::Register),
    entry(Opcode::Sub, b"SUB", OperandKind::Register),
    entry(Opcode::Sma, b"SMA", OperandKind::Register),
    entry(Opcode::Big, b"BIG", OperandKind::Register),
    entry(Opcode::Req, b"REQ", OperandKind::Register),
    entry(Opcode::Rnq, b"RNQ", OperandKind::Register),
    entry(Opcode::Veq, b"VEQ", OperandKind::Literal),
    entry(Opcode::Vnq, b"VNQ", OperandKind::Literal),
    entry(Opcode::Aou, b"AOU", OperandKind::Any),
    entry(Opcode::Dou, b"DOU", OperandKind::Any),
    entry(Opcode::Anh, b"ANH", OperandKind::Literal),
    entry(Opcode::Anl, b"ANL", OperandKind::Literal),
    entry(Opcode::Sva, b"SVA", OperandKind::Literal),
    entry(Opcode::Inh, b"INH", OperandKind::Literal),
    entry(Opcode::Inl, b"INL", OperandKind::Literal),
    entry(Opcode::Ton, b"TON", OperandKind::Any),
    entry(Opcode::Ptr, b"PTR", OperandKind::Register),
    entry(Opcode::Pch, b"PCH", OperandKind::Any),
    entry(Opcode::Clr, b"CLR", OperandKind::Any),
    entry(Opcode::Beg, b"BEG", OperandKind::Any),
    entry(Opcode::End, b"END", OperandKind::Any),
    entry(Opcode::Wai, b"WAI", OperandKind::Literal),
    entry(Opcode::Spo, b"SPO", OperandKind::Register),
    entry(Opcode::Jpo, b"JPO", OperandKind::Register),
    entry(Opcode::Jum, b"JUM", OperandKind::Literal),
    entry(Opcode::Ld1, b"LD1", OperandKind::Any),
    entry(Opcode::Ld2, b"LD2", OperandKind::Any),
];

/// Placeholder shown for opcode bytes without a table row.
pub const UNKNOWN_MNEMONIC: [u8; 3] = *b"XXX";

impl Opcode {
    /// Decode a stored opcode byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find(|e| e.opcode as u8 == value)
            .map(|e| e.opcode)
    }

    /// The persisted byte value.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The table row for this opcode.
    pub fn entry(self) -> &'static OpcodeEntry {
        // Rows are laid out in discriminant order.
        &OPCODE_TABLE[self as usize]
    }

    /// The three-character mnemonic.
    pub fn mnemonic(self) -> [u8; 3] {
        self.entry().mnemonic
    }

    /// The operand kind the handler expects.
    pub fn operand_kind(self) -> OperandKind {
        self.entry().operand
    }

    /// True for the opcodes that evaluate a condition and may skip ahead.
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            Opcode::Sma
                | Opcode::Big
                | Opcode::Req
                | Opcode::Rnq
                | Opcode::Veq
                | Opcode::Vnq
                | Opcode::Anh
                | Opcode::Anl
                | Opcode::Inh
                | Opcode::Inl
        )
    }
}

/// Look up an opcode by its typed mnemonic.
pub fn mnemonic_to_opcode(mnemonic: [u8; 3]) -> Option<Opcode> {
    OPCODE_TABLE
        .iter()
        .find(|e| e.mnemonic == mnemonic)
        .map(|e| e.opcode)
}

/// Look up the mnemonic for a raw opcode byte, `XXX` when unknown.
pub fn opcode_to_mnemonic(value: u8) -> [u8; 3] {
    Opcode::from_u8(value)
        .map(Opcode::mnemonic)
        .unwrap_or(UNKNOWN_MNEMONIC)
}
