//! Interpreter for the controller's instruction set.
//!
//! Programs are sequences of 4-byte instruction records:
//! - a one-byte opcode (see [`opcode::OPCODE_TABLE`])
//! - a three-character operand: a register `Rnn`, a literal `0`-`999`,
//!   or free text
//!
//! The controller has 100 wrapping 16-bit registers, a register pointer,
//! and separate program and output cursors.

pub mod opcode;
pub mod decode;
pub mod memory;
pub mod registers;
pub mod condition;
pub mod execute;

pub use opcode::{Opcode, OperandKind, OPCODE_TABLE};
pub use memory::{InstructionStore, Memory, StoreError, PROGRAM_CAPACITY};
pub use registers::Registers;
pub use decode::{Instruction, Operand, DecodeError};
pub use execute::{Cpu, CpuError, CpuState, Step, StepOutcome};
