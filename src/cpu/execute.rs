//! Execution engine.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! The engine owns only machine state; the program store and the board are
//! borrowed for each step.

use crate::cpu::condition::{self, ConditionError};
use crate::cpu::decode::{self, number_to_digits, DecodeError, Instruction, Operand};
use crate::cpu::memory::{InstructionStore, StoreError};
use crate::cpu::opcode::{Opcode, OperandKind};
use crate::cpu::Registers;
use crate::hal::{Hardware, Led, LedColour, Screen, Tone};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// Reached the end of the program.
    Halted,
    /// CPU encountered an error.
    Error,
}

/// One executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Position the instruction was fetched from.
    pub position: usize,
    pub instruction: Instruction,
    pub opcode: Opcode,
    pub operand: Operand,
}

/// Result of a single [`Cpu::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Executed(Step),
    /// The cursor reached an EMPTY record or ran past the last slot.
    Ended { position: usize },
}

/// The interpreter.
#[derive(Clone, Serialize, Deserialize)]
pub struct Cpu {
    /// Registers and cursors.
    pub regs: Registers,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed since the last reset.
    pub steps: u64,
    /// Last executed instruction (for debugging).
    last_step: Option<Step>,
}

impl Cpu {
    /// Create a new CPU with zeroed state.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            state: CpuState::Running,
            steps: 0,
            last_step: None,
        }
    }

    /// Reset the CPU to its initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.state = CpuState::Running;
        self.steps = 0;
        self.last_step = None;
    }

    /// Execute a single instruction.
    pub fn step<S, B>(&mut self, store: &S, board: &mut B) -> Result<StepOutcome, CpuError>
    where
        S: InstructionStore + ?Sized,
        B: Screen + Hardware + ?Sized,
    {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let position = self.regs.cursor;
        let result = self.fetch_and_execute(position, store, board);

        match result {
            Ok(StepOutcome::Executed(step)) => {
                self.steps += 1;
                self.last_step = Some(step);
            }
            Ok(StepOutcome::Ended { .. }) => self.state = CpuState::Halted,
            Err(_) => self.state = CpuState::Error,
        }

        result
    }

    /// Run until the program ends, fails, or `max_steps` instructions have
    /// executed. Does not consult the mode switch.
    ///
    /// Returns the number of instructions executed.
    pub fn run_limited<S, B>(&mut self, store: &S, board: &mut B, max_steps: u64) -> Result<u64, CpuError>
    where
        S: InstructionStore + ?Sized,
        B: Screen + Hardware + ?Sized,
    {
        let start_steps = self.steps;

        while self.state == CpuState::Running && self.steps - start_steps < max_steps {
            self.step(store, board)?;
        }

        Ok(self.steps - start_steps)
    }

    fn fetch_and_execute<S, B>(&mut self, position: usize, store: &S, board: &mut B) -> Result<StepOutcome, CpuError>
    where
        S: InstructionStore + ?Sized,
        B: Screen + Hardware + ?Sized,
    {
        // Fetch
        if position >= store.capacity() {
            return Ok(StepOutcome::Ended { position });
        }
        let instruction = store
            .get(position)
            .map_err(|source| CpuError::Store { position, source })?;
        if instruction.is_empty() {
            return Ok(StepOutcome::Ended { position });
        }

        // Advance before executing (jumps override)
        self.regs.advance();

        // Decode
        let (opcode, operand) = decode::decode(&instruction).map_err(|e| match e {
            DecodeError::UnknownOpcode(opcode) => CpuError::UnknownOpcode { position, opcode },
        })?;

        let step = Step { position, instruction, opcode, operand };

        // Execute
        self.execute(&step, store, board)?;

        Ok(StepOutcome::Executed(step))
    }

    fn execute<S, B>(&mut self, step: &Step, store: &S, board: &mut B) -> Result<(), CpuError>
    where
        S: InstructionStore + ?Sized,
        B: Screen + Hardware + ?Sized,
    {
        let position = step.position;

        match step.opcode {
            // ==================== Registers ====================

            Opcode::Pic => {
                let n = register(step)?;
                self.regs.point(n);
            }

            Opcode::Set => {
                let value = literal(step)?;
                self.regs.set_pointed(value);
            }

            Opcode::Inc => {
                let value = literal(step)?;
                self.regs.add_pointed(value);
            }

            Opcode::Dec => {
                let value = literal(step)?;
                self.regs.sub_pointed(value);
            }

            Opcode::Cop => {
                let n = register(step)?;
                let value = self.regs.pointed();
                self.regs.set(n, value);
            }

            Opcode::Add => {
                let n = register(step)?;
                let value = self.regs.get(n);
                self.regs.add_pointed(value);
            }

            Opcode::Sub => {
                let n = register(step)?;
                let value = self.regs.get(n);
                self.regs.sub_pointed(value);
            }

            // ==================== Conditions ====================

            Opcode::Sma => {
                let n = register(step)?;
                let holds = self.regs.pointed() < self.regs.get(n);
                self.branch(holds, position, store)?;
            }

            Opcode::Big => {
                let n = register(step)?;
                let holds = self.regs.pointed() > self.regs.get(n);
                self.branch(holds, position, store)?;
            }

            Opcode::Req => {
                let n = register(step)?;
                let holds = self.regs.pointed() == self.regs.get(n);
                self.branch(holds, position, store)?;
            }

            Opcode::Rnq => {
                let n = register(step)?;
                let holds = self.regs.pointed() != self.regs.get(n);
                self.branch(holds, position, store)?;
            }

            Opcode::Veq => {
                let value = literal(step)?;
                let holds = self.regs.pointed() == value;
                self.branch(holds, position, store)?;
            }

            Opcode::Vnq => {
                let value = literal(step)?;
                let holds = self.regs.pointed() != value;
                self.branch(holds, position, store)?;
            }

            Opcode::Anh => {
                let channel = literal(step)?;
                let level = board.read_analog(channel) as u16;
                let holds = self.regs.pointed() < level;
                self.branch(holds, position, store)?;
            }

            Opcode::Anl => {
                let channel = literal(step)?;
                let level = board.read_analog(channel) as u16;
                let holds = self.regs.pointed() >= level;
                self.branch(holds, position, store)?;
            }

            Opcode::Inh => {
                let port = literal(step)?;
                let holds = board.is_input_high(port);
                self.branch(holds, position, store)?;
            }

            Opcode::Inl => {
                let port = literal(step)?;
                let holds = !board.is_input_high(port);
                self.branch(holds, position, store)?;
            }

            // ==================== Inputs ====================

            Opcode::Sva => {
                let channel = literal(step)?;
                let level = board.read_analog(channel);
                self.regs.set_pointed(level as u16);
            }

            // ==================== Output ====================

            Opcode::Ptr => {
                let n = register(step)?;
                let digits = number_to_digits(self.regs.get(n));
                self.write_at_output(&digits, board);
            }

            Opcode::Pch => {
                self.write_at_output(&step.instruction.operands, board);
            }

            Opcode::Clr => {
                self.regs.output = 0;
                board.clear();
            }

            Opcode::Ton => {
                let tone = Tone::parse(step.instruction.operands)
                    .ok_or(CpuError::BadNote { position })?;
                board.set_tone(tone);
            }

            Opcode::Ld1 => {
                board.set_led(Led::Left, LedColour::from_byte(step.instruction.operands[0]));
            }

            Opcode::Ld2 => {
                board.set_led(Led::Right, LedColour::from_byte(step.instruction.operands[0]));
            }

            Opcode::Wai => {
                let tenths = literal(step)?;
                board.wait(tenths);
            }

            // ==================== Control Flow ====================

            Opcode::Jum => {
                let target = literal(step)?;
                self.jump(target as usize, position, store)?;
            }

            Opcode::Spo => {
                let n = register(step)?;
                self.regs.set(n, position as u16);
            }

            Opcode::Jpo => {
                let n = register(step)?;
                let target = self.regs.get(n);
                self.jump(target as usize, position, store)?;
            }

            // ==================== No-ops ====================

            Opcode::Beg | Opcode::End | Opcode::Aou | Opcode::Dou | Opcode::Empty => {}
        }

        Ok(())
    }

    /// Apply a condition result through the block skipper.
    fn branch<S>(&mut self, holds: bool, position: usize, store: &S) -> Result<(), CpuError>
    where
        S: InstructionStore + ?Sized,
    {
        condition::evaluate(holds, store, &mut self.regs.cursor).map_err(|e| match e {
            ConditionError::UnmatchedBlock { start } => CpuError::UnmatchedBlock { position, start },
            ConditionError::Store(source) => CpuError::Store { position, source },
        })
    }

    fn jump<S>(&mut self, target: usize, position: usize, store: &S) -> Result<(), CpuError>
    where
        S: InstructionStore + ?Sized,
    {
        if target >= store.capacity() {
            return Err(CpuError::Overrun { position, target });
        }
        self.regs.jump(target);
        Ok(())
    }

    /// Write up to three characters at the output cursor. The cursor moves
    /// once per non-NUL byte.
    fn write_at_output<B: Screen + ?Sized>(&mut self, bytes: &[u8], board: &mut B) {
        board.write_string(bytes, self.regs.output, 0);
        self.regs.output += bytes.iter().filter(|&&b| b != 0).count();
    }

    /// Get the last executed instruction.
    pub fn last_step(&self) -> Option<Step> {
        self.last_step
    }

    /// Check if the program has ended.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }
}

fn register(step: &Step) -> Result<u8, CpuError> {
    match step.operand {
        Operand::RegisterRef(n) => Ok(n),
        _ => Err(mismatch(step, OperandKind::Register)),
    }
}

fn literal(step: &Step) -> Result<u16, CpuError> {
    match step.operand {
        Operand::Literal(value) => Ok(value),
        _ => Err(mismatch(step, OperandKind::Literal)),
    }
}

fn mismatch(step: &Step, expected: OperandKind) -> CpuError {
    CpuError::OperandMismatch {
        position: step.position,
        opcode: step.opcode,
        expected,
        found: step.operand,
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during execution.
///
/// Every variant except [`CpuError::NotRunning`] names the position of the
/// offending instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("unknown opcode {opcode} at position {position}")]
    UnknownOpcode { position: usize, opcode: u8 },

    #[error("{opcode:?} at position {position} expects a {expected:?} operand, found {found:?}")]
    OperandMismatch {
        position: usize,
        opcode: Opcode,
        expected: OperandKind,
        found: Operand,
    },

    #[error("jump from position {position} to {target} leaves the program")]
    Overrun { position: usize, target: usize },

    #[error("condition at position {position}: block opened at {start} has no matching END")]
    UnmatchedBlock { position: usize, start: usize },

    #[error("invalid note at position {position}")]
    BadNote { position: usize },

    #[error("storage error at position {position}: {source}")]
    Store { position: usize, source: StoreError },
}

impl CpuError {
    /// Program position the error refers to.
    pub fn position(&self) -> Option<usize> {
        match self {
            CpuError::NotRunning(_) => None,
            CpuError::UnknownOpcode { position, .. }
            | CpuError::OperandMismatch { position, .. }
            | CpuError::Overrun { position, .. }
            | CpuError::UnmatchedBlock { position, .. }
            | CpuError::BadNote { position }
            | CpuError::Store { position, .. } => Some(*position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::memory::Memory;
    use crate::hal::SimBoard;

    fn lit(opcode: Opcode, value: u16) -> Instruction {
        Instruction::with_literal(opcode, value)
    }

    fn reg(opcode: Opcode, index: u8) -> Instruction {
        Instruction::with_register(opcode, index)
    }

    fn raw(opcode: Opcode, operands: &[u8; 3]) -> Instruction {
        Instruction::new(opcode, *operands)
    }

    fn run(program: &[Instruction]) -> (Cpu, SimBoard, Result<u64, CpuError>) {
        let mem = Memory::from_program(program).unwrap();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        let result = cpu.run_limited(&mem, &mut board, 1000);
        (cpu, board, result)
    }

    #[test]
    fn test_empty_program_halts() {
        let (cpu, _, result) = run(&[]);
        assert_eq!(result, Ok(0));
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_set_inc_dec() {
        let (cpu, _, result) = run(&[
            reg(Opcode::Pic, 3),
            lit(Opcode::Set, 10),
            lit(Opcode::Inc, 8),
            lit(Opcode::Dec, 3),
        ]);
        assert_eq!(result, Ok(4));
        assert_eq!(cpu.regs.get(3), 15);
        assert_eq!(cpu.regs.pointer, 3);
    }

    #[test]
    fn test_dec_wraps() {
        let (cpu, _, _) = run(&[lit(Opcode::Dec, 1)]);
        assert_eq!(cpu.regs.get(0), u16::MAX);
    }

    #[test]
    fn test_cop_add_sub() {
        let (cpu, _, _) = run(&[
            reg(Opcode::Pic, 0),
            lit(Opcode::Set, 5),
            reg(Opcode::Cop, 1),
            reg(Opcode::Add, 1),
            reg(Opcode::Add, 1),
            reg(Opcode::Pic, 1),
            reg(Opcode::Sub, 0),
        ]);
        assert_eq!(cpu.regs.get(0), 15);
        assert_eq!(cpu.regs.get(1), 5u16.wrapping_sub(15));
    }

    #[test]
    fn test_ptr_prints_three_digits() {
        let (cpu, board, _) = run(&[
            reg(Opcode::Pic, 0),
            lit(Opcode::Set, 5),
            reg(Opcode::Ptr, 0),
        ]);
        assert_eq!(board.writes, vec![(b"005".to_vec(), 0, 0)]);
        assert_eq!(cpu.regs.output, 3);
    }

    #[test]
    fn test_pch_advances_by_written_characters() {
        let (cpu, board, _) = run(&[raw(Opcode::Pch, b"HEL"), raw(Opcode::Pch, b"LO\0")]);
        assert_eq!(cpu.regs.output, 5);
        assert_eq!(board.screen.line(0).trim_end(), "HELLO");
    }

    #[test]
    fn test_clr_resets_output_cursor() {
        let (cpu, board, _) = run(&[raw(Opcode::Pch, b"ABC"), Instruction::bare(Opcode::Clr)]);
        assert_eq!(cpu.regs.output, 0);
        assert!(board.screen.is_blank());
    }

    #[test]
    fn test_condition_false_skips_next() {
        let (cpu, board, _) = run(&[
            lit(Opcode::Veq, 1),
            raw(Opcode::Ld1, b"R\0\0"),
            raw(Opcode::Ld2, b"G\0\0"),
        ]);
        assert_eq!(board.leds, [LedColour::Off, LedColour::Green]);
        assert_eq!(cpu.steps, 2);
    }

    #[test]
    fn test_condition_true_runs_block() {
        let (_, board, _) = run(&[
            lit(Opcode::Vnq, 1),
            Instruction::bare(Opcode::Beg),
            raw(Opcode::Ld1, b"V\0\0"),
            Instruction::bare(Opcode::End),
            raw(Opcode::Ld2, b"B\0\0"),
        ]);
        assert_eq!(board.leds, [LedColour::Violet, LedColour::Blue]);
    }

    #[test]
    fn test_register_comparisons() {
        let program = |opcode| {
            vec![
                reg(Opcode::Pic, 1),
                lit(Opcode::Set, 7),
                reg(Opcode::Pic, 0),
                lit(Opcode::Set, 3),
                reg(opcode, 1),
                raw(Opcode::Ld1, b"W\0\0"),
            ]
        };
        let lit_up = |opcode| run(&program(opcode)).1.leds[0] == LedColour::White;
        assert!(lit_up(Opcode::Sma));
        assert!(!lit_up(Opcode::Big));
        assert!(!lit_up(Opcode::Req));
        assert!(lit_up(Opcode::Rnq));
    }

    #[test]
    fn test_analog_conditions() {
        let program = |opcode| {
            let mem = Memory::from_program(&[
                lit(Opcode::Set, 110),
                lit(opcode, 8),
                raw(Opcode::Ld1, b"T\0\0"),
            ])
            .unwrap();
            let mut board = SimBoard::running();
            board.analog[8] = 150;
            Cpu::new().run_limited(&mem, &mut board, 10).unwrap();
            board.leds[0]
        };
        assert_eq!(program(Opcode::Anh), LedColour::Turquoise);
        assert_eq!(program(Opcode::Anl), LedColour::Off);
    }

    #[test]
    fn test_sva_reads_channel() {
        let mem = Memory::from_program(&[lit(Opcode::Sva, 2)]).unwrap();
        let mut board = SimBoard::running();
        board.analog[2] = 77;
        let mut cpu = Cpu::new();
        cpu.run_limited(&mem, &mut board, 10).unwrap();
        assert_eq!(cpu.regs.get(0), 77);
    }

    #[test]
    fn test_input_conditions_are_complements() {
        let led_for = |opcode, pressed| {
            let mem = Memory::from_program(&[lit(opcode, 0), raw(Opcode::Ld1, b"R\0\0")]).unwrap();
            let mut board = SimBoard::running();
            board.inputs[0] = pressed;
            Cpu::new().run_limited(&mem, &mut board, 10).unwrap();
            board.leds[0] == LedColour::Red
        };
        assert!(led_for(Opcode::Inh, true));
        assert!(!led_for(Opcode::Inh, false));
        assert!(!led_for(Opcode::Inl, true));
        assert!(led_for(Opcode::Inl, false));
    }

    #[test]
    fn test_tone() {
        let (_, board, _) = run(&[raw(Opcode::Ton, b"A4\0"), raw(Opcode::Ton, b"0\0\0")]);
        assert_eq!(board.tones.len(), 2);
        assert!(!board.tones[0].is_off());
        assert!(board.tone.is_off());
    }

    #[test]
    fn test_bad_note() {
        let (cpu, _, result) = run(&[raw(Opcode::Ton, b"X1\0")]);
        assert_eq!(result, Err(CpuError::BadNote { position: 0 }));
        assert_eq!(cpu.state, CpuState::Error);
    }

    #[test]
    fn test_wait() {
        let (_, board, _) = run(&[lit(Opcode::Wai, 25)]);
        assert_eq!(board.elapsed_tenths, 25);
    }

    #[test]
    fn test_jum() {
        let mem = Memory::from_program(&[lit(Opcode::Inc, 1), lit(Opcode::Jum, 0)]).unwrap();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        let executed = cpu.run_limited(&mem, &mut board, 10).unwrap();
        assert_eq!(executed, 10);
        assert_eq!(cpu.regs.get(0), 5);
    }

    #[test]
    fn test_spo_jpo() {
        let mem = Memory::from_program(&[
            Instruction::bare(Opcode::Clr),
            reg(Opcode::Spo, 9),
            lit(Opcode::Inc, 1),
            reg(Opcode::Jpo, 9),
        ])
        .unwrap();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        cpu.run_limited(&mem, &mut board, 7).unwrap();
        // SPO saves its own position, so JPO re-enters at SPO.
        assert_eq!(cpu.regs.get(9), 1);
        assert_eq!(cpu.regs.get(0), 2);
        assert_eq!(cpu.regs.cursor, 1);
    }

    #[test]
    fn test_operand_mismatch() {
        let (_, _, result) = run(&[lit(Opcode::Pic, 4)]);
        assert_eq!(
            result,
            Err(CpuError::OperandMismatch {
                position: 0,
                opcode: Opcode::Pic,
                expected: OperandKind::Register,
                found: Operand::Literal(4),
            })
        );

        let (_, _, result) = run(&[Instruction::bare(Opcode::Clr), reg(Opcode::Set, 4)]);
        assert_eq!(result.unwrap_err().position(), Some(1));
    }

    #[test]
    fn test_unknown_opcode() {
        let (_, _, result) = run(&[Instruction { opcode: 200, operands: [0; 3] }]);
        assert_eq!(result, Err(CpuError::UnknownOpcode { position: 0, opcode: 200 }));
    }

    #[test]
    fn test_jump_overrun() {
        let mut mem = Memory::with_capacity(8);
        mem.load_program(0, &[lit(Opcode::Jum, 900)]).unwrap();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        let err = cpu.run_limited(&mem, &mut board, 10).unwrap_err();
        assert_eq!(err, CpuError::Overrun { position: 0, target: 900 });
    }

    #[test]
    fn test_unmatched_block() {
        let (_, _, result) = run(&[
            lit(Opcode::Veq, 1),
            Instruction::bare(Opcode::Beg),
            lit(Opcode::Inc, 1),
        ]);
        assert_eq!(result, Err(CpuError::UnmatchedBlock { position: 0, start: 1 }));
    }

    #[test]
    fn test_full_store_ends_at_capacity() {
        let mut mem = Memory::with_capacity(2);
        mem.load_program(0, &[lit(Opcode::Inc, 1), lit(Opcode::Inc, 1)]).unwrap();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        assert_eq!(cpu.run_limited(&mem, &mut board, 10), Ok(2));
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_step_after_halt() {
        let mem = Memory::new();
        let mut board = SimBoard::running();
        let mut cpu = Cpu::new();
        assert_eq!(cpu.step(&mem, &mut board), Ok(StepOutcome::Ended { position: 0 }));
        assert_eq!(cpu.step(&mem, &mut board), Err(CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_noops() {
        let (cpu, board, result) = run(&[
            Instruction::bare(Opcode::Beg),
            Instruction::bare(Opcode::End),
            raw(Opcode::Aou, b"123"),
            raw(Opcode::Dou, b"1\0\0"),
        ]);
        assert_eq!(result, Ok(4));
        assert!(board.writes.is_empty());
        assert!(cpu.regs.values().iter().all(|&v| v == 0));
    }
}
