//! Program storage.
//!
//! The controller keeps its program in non-volatile storage as a fixed
//! array of 4080 four-byte records. [`InstructionStore`] abstracts the
//! storage so the same shifting logic runs over memory, a file image or a
//! hardware region. [`Memory`] is the in-memory implementation.

use crate::cpu::decode::Instruction;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of program slots.
pub const PROGRAM_CAPACITY: usize = 4080;

/// Durable storage for a program.
///
/// Implementors provide raw slot access; the editing operations are built
/// on top of it.
pub trait InstructionStore {
    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Read the instruction at `pos`.
    fn get(&self, pos: usize) -> Result<Instruction, StoreError>;

    /// Overwrite the instruction at `pos`.
    fn put(&mut self, pos: usize, instr: Instruction) -> Result<(), StoreError>;

    /// Zero every slot.
    fn erase_all(&mut self);

    /// Position of the first EMPTY record, or the capacity if there is none.
    fn program_end(&self) -> usize {
        (0..self.capacity())
            .find(|&pos| matches!(self.get(pos), Ok(instr) if instr.is_empty()))
            .unwrap_or_else(|| self.capacity())
    }

    /// Delete the instruction at `pos`, shifting the tail down by one.
    ///
    /// Shifting stops once an EMPTY record has been copied or the last slot
    /// has been filled (with EMPTY).
    fn remove(&mut self, pos: usize) -> Result<(), StoreError> {
        let capacity = self.capacity();
        if pos >= capacity {
            return Err(StoreError::AddressOutOfRange(pos));
        }

        for i in pos..capacity {
            let next = if i + 1 < capacity {
                self.get(i + 1)?
            } else {
                Instruction::EMPTY
            };
            self.put(i, next)?;
            if next.is_empty() {
                break;
            }
        }
        Ok(())
    }

    /// Open an EMPTY gap at `pos`, shifting `pos..end` up by one.
    ///
    /// Fails when the program already fills every slot.
    fn insert_empty(&mut self, pos: usize) -> Result<(), StoreError> {
        let capacity = self.capacity();
        if pos >= capacity {
            return Err(StoreError::AddressOutOfRange(pos));
        }

        let end = self.program_end();
        if end >= capacity {
            return Err(StoreError::ProgramFull(capacity));
        }

        for i in (pos + 1..=end).rev() {
            let prev = self.get(i - 1)?;
            self.put(i, prev)?;
        }
        self.put(pos, Instruction::EMPTY)
    }
}

/// In-memory program storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    slots: Vec<Instruction>,
}

impl Memory {
    /// Create an erased store with the standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(PROGRAM_CAPACITY)
    }

    /// Create an erased store with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![Instruction::EMPTY; capacity],
        }
    }

    /// Create a store holding `program` from position 0.
    pub fn from_program(program: &[Instruction]) -> Result<Self, StoreError> {
        let mut mem = Self::new();
        mem.load_program(0, program)?;
        Ok(mem)
    }

    /// Copy a program into storage starting at `start`.
    pub fn load_program(&mut self, start: usize, program: &[Instruction]) -> Result<(), StoreError> {
        if start + program.len() > self.slots.len() {
            return Err(StoreError::ProgramTooLarge {
                size: program.len(),
                available: self.slots.len().saturating_sub(start),
            });
        }

        self.slots[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// The instructions before the first EMPTY record.
    pub fn program(&self) -> &[Instruction] {
        &self.slots[..self.program_end()]
    }

    /// All slots.
    pub fn slots(&self) -> &[Instruction] {
        &self.slots
    }
}

impl InstructionStore for Memory {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn get(&self, pos: usize) -> Result<Instruction, StoreError> {
        self.slots
            .get(pos)
            .copied()
            .ok_or(StoreError::AddressOutOfRange(pos))
    }

    #[inline]
    fn put(&mut self, pos: usize, instr: Instruction) -> Result<(), StoreError> {
        let slot = self
            .slots
            .get_mut(pos)
            .ok_or(StoreError::AddressOutOfRange(pos))?;
        *slot = instr;
        Ok(())
    }

    fn erase_all(&mut self) {
        for slot in &mut self.slots {
            *slot = Instruction::EMPTY;
        }
    }

    fn program_end(&self) -> usize {
        self.slots
            .iter()
            .position(Instruction::is_empty)
            .unwrap_or(self.slots.len())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("program_len", &self.program_end())
            .field("capacity", &self.slots.len())
            .finish()
    }
}

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("program position {0} out of range")]
    AddressOutOfRange(usize),

    #[error("program is full ({0} instructions)")]
    ProgramFull(usize),

    #[error("program size {size} exceeds available space {available}")]
    ProgramTooLarge { size: usize, available: usize },
}
