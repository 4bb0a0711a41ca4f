//! Conditional block skipping.
//!
//! Every comparison instruction funnels its result through [`evaluate`].
//! When the condition holds, execution continues with the next instruction.
//! When it fails, the next instruction is skipped, or, if that instruction
//! opens a `BEG` block, everything up to and including the matching `END`
//! is skipped. Blocks nest.
//!
//! ```text
//! VEQ 5      ; condition
//! BEG
//!   BEG      ; nested blocks are skipped as a whole
//!   LD1 R
//!   END
//! END
//! LD1 A      ; execution resumes here when the condition fails
//! ```

use crate::cpu::memory::{InstructionStore, StoreError};
use crate::cpu::opcode::Opcode;
use thiserror::Error;

/// Apply a condition result to the program cursor.
///
/// `cursor` must already point past the conditional instruction. An EMPTY
/// record is never skipped, so a condition at the end of a program still
/// ends it.
pub fn evaluate<S: InstructionStore + ?Sized>(
    condition: bool,
    store: &S,
    cursor: &mut usize,
) -> Result<(), ConditionError> {
    if condition {
        return Ok(());
    }

    let start = *cursor;
    if start >= store.capacity() {
        return Ok(());
    }
    let first = store.get(start)?;
    if first.is_empty() {
        return Ok(());
    }

    if first.is(Opcode::Beg) {
        let capacity = store.capacity();
        let mut depth = 1usize;
        while depth > 0 {
            *cursor += 1;
            if *cursor >= capacity {
                return Err(ConditionError::UnmatchedBlock { start });
            }
            let instr = store.get(*cursor)?;
            if instr.is_empty() {
                return Err(ConditionError::UnmatchedBlock { start });
            } else if instr.is(Opcode::Beg) {
                depth += 1;
            } else if instr.is(Opcode::End) {
                depth -= 1;
            }
        }
    }

    *cursor += 1;
    Ok(())
}

/// Errors raised while skipping a block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("block opened at position {start} has no matching END")]
    UnmatchedBlock { start: usize },

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::Instruction;
    use crate::cpu::memory::Memory;

    fn op(opcode: Opcode) -> Instruction {
        Instruction::bare(opcode)
    }

    fn x() -> Instruction {
        Instruction::new(Opcode::Pch, *b"X\0\0")
    }

    fn y() -> Instruction {
        Instruction::new(Opcode::Pch, *b"Y\0\0")
    }

    fn store(program: &[Instruction]) -> Memory {
        Memory::from_program(program).unwrap()
    }

    #[test]
    fn test_true_condition_does_not_move() {
        let mem = store(&[op(Opcode::Veq), x(), y()]);
        let mut cursor = 1;
        evaluate(true, &mem, &mut cursor).unwrap();
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_false_without_block_skips_one() {
        let mem = store(&[op(Opcode::Veq), x(), y()]);
        let mut cursor = 1;
        evaluate(false, &mem, &mut cursor).unwrap();
        // Two past the conditional instruction itself.
        assert_eq!(cursor, 2);
    }

    #[test]
    fn test_simple_block() {
        let program = [op(Opcode::Veq), op(Opcode::Beg), x(), op(Opcode::End), y()];
        let mem = store(&program);

        let mut cursor = 1;
        evaluate(false, &mem, &mut cursor).unwrap();
        assert_eq!(cursor, 4);

        let mut cursor = 1;
        evaluate(true, &mem, &mut cursor).unwrap();
        // Executing BEG is a no-op, so X runs next.
        assert_eq!(cursor, 1);
    }

    #[test]
    fn test_nested_blocks() {
        let program = [
            op(Opcode::Veq),
            op(Opcode::Beg),
            op(Opcode::Beg),
            x(),
            op(Opcode::End),
            op(Opcode::End),
            y(),
        ];
        let mem = store(&program);
        let mut cursor = 1;
        evaluate(false, &mem, &mut cursor).unwrap();
        assert_eq!(cursor, 6);
    }

    #[test]
    fn test_sibling_blocks_inside_block() {
        let program = [
            op(Opcode::Veq),
            op(Opcode::Beg),
            op(Opcode::Beg),
            op(Opcode::End),
            op(Opcode::Beg),
            x(),
            op(Opcode::End),
            op(Opcode::End),
            y(),
        ];
        let mem = store(&program);
        let mut cursor = 1;
        evaluate(false, &mem, &mut cursor).unwrap();
        assert_eq!(cursor, 8);
    }

    #[test]
    fn test_unmatched_block() {
        let mem = store(&[op(Opcode::Veq), op(Opcode::Beg), x()]);
        let mut cursor = 1;
        let err = evaluate(false, &mem, &mut cursor).unwrap_err();
        assert_eq!(err, ConditionError::UnmatchedBlock { start: 1 });
    }

    #[test]
    fn test_unmatched_block_in_full_store() {
        let mut mem = Memory::with_capacity(3);
        mem.load_program(0, &[op(Opcode::Veq), op(Opcode::Beg), x()]).unwrap();
        let mut cursor = 1;
        let err = evaluate(false, &mem, &mut cursor).unwrap_err();
        assert_eq!(err, ConditionError::UnmatchedBlock { start: 1 });
    }

    #[test]
    fn test_never_skips_program_end() {
        let mem = store(&[op(Opcode::Veq)]);
        let mut cursor = 1;
        evaluate(false, &mem, &mut cursor).unwrap();
        assert_eq!(cursor, 1);
    }
}
