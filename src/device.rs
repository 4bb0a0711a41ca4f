//! The device: program store, interpreter and editor on one board.
//!
//! The mode switch selects between editing and running. [`Device::power_on`]
//! alternates between the two until the board is switched off.

use crate::cpu::memory::InstructionStore;
use crate::cpu::{Cpu, CpuError, Registers, Step, StepOutcome};
use crate::editor::{EditError, EditOutcome, Editor};
use crate::hal::{Board, Led, LedColour, Mode, Tone};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The program reached its end.
    Terminated { steps: u64 },
    /// The mode switch left running mode.
    Interrupted { steps: u64 },
    /// The step limit was reached.
    StepLimit { steps: u64 },
    /// An instruction failed; the error notice is showing.
    Faulted { error: CpuError },
}

/// A mode that just ended, as handed to [`Device::power_on_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeReport<'a> {
    /// Editing ended with the last line rejected.
    Rejected(&'a EditError),
    /// A run ended.
    Ran(&'a RunOutcome),
}

/// A controller with its program store and board.
pub struct Device<S, B> {
    pub store: S,
    pub board: B,
    pub cpu: Cpu,
    pub editor: Editor,
    step_limit: Option<u64>,
    last_edit: Option<Result<EditOutcome, EditError>>,
    last_run: Option<RunOutcome>,
}

impl<S: InstructionStore, B: Board> Device<S, B> {
    pub fn new(store: S, board: B) -> Self {
        Self {
            store,
            board,
            cpu: Cpu::new(),
            editor: Editor::new(),
            step_limit: None,
            last_edit: None,
            last_run: None,
        }
    }

    /// Stop runs after `limit` instructions.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.set_step_limit(Some(limit));
        self
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    /// Result of the last key handled by the editor.
    pub fn last_edit(&self) -> Option<&Result<EditOutcome, EditError>> {
        self.last_edit.as_ref()
    }

    /// Outcome of the last run.
    pub fn last_run(&self) -> Option<&RunOutcome> {
        self.last_run.as_ref()
    }

    /// Erase the whole program.
    pub fn erase_program(&mut self) {
        self.store.erase_all();
    }

    /// Alternate between editing and running until the board powers off.
    pub fn power_on(&mut self) {
        self.power_on_with(|_, _| {}, |_, _| {});
    }

    /// Like [`Device::power_on`], calling `trace` after every executed
    /// instruction and `report` on the board whenever a mode ends with
    /// something to show.
    pub fn power_on_with<T, R>(&mut self, mut trace: T, mut report: R)
    where
        T: FnMut(&Step, &Registers),
        R: FnMut(&mut B, ModeReport<'_>),
    {
        loop {
            match self.board.mode() {
                Mode::Editing => {
                    self.enter_editing_mode();
                    if let Some(Err(error)) = &self.last_edit {
                        report(&mut self.board, ModeReport::Rejected(error));
                    }
                }
                Mode::Running => {
                    let outcome = self.run_traced(&mut trace);
                    report(&mut self.board, ModeReport::Ran(&outcome));
                    // Keep the final screen until the switch moves
                    while self.board.mode() == Mode::Running {
                        self.board.idle();
                    }
                }
                Mode::Off => return,
            }
        }
    }

    /// Run the editor until the mode switch leaves editing mode.
    ///
    /// Returns the number of keys handled.
    pub fn enter_editing_mode(&mut self) -> usize {
        if self.board.mode() != Mode::Editing {
            return 0;
        }

        self.board.set_tone(Tone::Off);
        self.board.set_led(Led::Left, LedColour::Off);
        self.board.set_led(Led::Right, LedColour::Off);
        self.board.show_editing_message();
        self.editor.begin(&self.store, &mut self.board);

        let mut handled = 0;
        while self.board.mode() == Mode::Editing {
            match self.board.next_key() {
                Some(key) => {
                    let result = self.editor.handle_key(key, &mut self.store, &mut self.board);
                    self.last_edit = Some(result);
                    handled += 1;
                }
                None => self.board.idle(),
            }
        }
        handled
    }

    /// Run the program from position 0 until it ends, fails, or the mode
    /// switch leaves running mode.
    pub fn enter_running_mode(&mut self) -> RunOutcome {
        self.run_traced(|_, _| {})
    }

    /// Like [`Device::enter_running_mode`], calling `trace` after every
    /// executed instruction.
    pub fn run_traced<F>(&mut self, mut trace: F) -> RunOutcome
    where
        F: FnMut(&Step, &Registers),
    {
        if self.board.mode() != Mode::Running {
            return self.finish(RunOutcome::Interrupted { steps: 0 });
        }

        self.board.show_running_message();
        self.cpu.reset();
        self.board.start_timer();

        loop {
            if self.board.mode() != Mode::Running {
                let steps = self.cpu.steps;
                return self.finish(RunOutcome::Interrupted { steps });
            }
            if let Some(limit) = self.step_limit {
                if self.cpu.steps >= limit {
                    let steps = self.cpu.steps;
                    return self.finish(RunOutcome::StepLimit { steps });
                }
            }

            match self.cpu.step(&self.store, &mut self.board) {
                Ok(StepOutcome::Executed(step)) => trace(&step, &self.cpu.regs),
                Ok(StepOutcome::Ended { .. }) => {
                    // A wait cut short by the switch ends the program early
                    if self.board.mode() == Mode::Running {
                        self.board.show_terminated_message();
                    }
                    let steps = self.cpu.steps;
                    return self.finish(RunOutcome::Terminated { steps });
                }
                Err(error) => {
                    if let Some(position) = error.position() {
                        self.board.show_error_message(position);
                    }
                    return self.finish(RunOutcome::Faulted { error });
                }
            }
        }
    }

    fn finish(&mut self, outcome: RunOutcome) -> RunOutcome {
        self.last_run = Some(outcome.clone());
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;
    use crate::cpu::{Instruction, Memory, Opcode};
    use crate::hal::{ModeScript, Notice, SimBoard};

    fn device(listing: &str, board: SimBoard) -> Device<Memory, SimBoard> {
        let program = assemble(listing).unwrap();
        Device::new(Memory::from_program(&program).unwrap(), board)
    }

    #[test]
    fn test_prints_register() {
        let mut dev = device("PIC R0\nSET 5\nPTR R0\n", SimBoard::running());
        let outcome = dev.enter_running_mode();
        assert_eq!(outcome, RunOutcome::Terminated { steps: 3 });
        assert!(dev.board.writes.contains(&(b"005".to_vec(), 0, 0)));
        assert_eq!(dev.board.notices, vec![Notice::Running, Notice::Terminated]);
        assert_eq!(dev.board.screen.line(1).trim(), "TERMINATED");
    }

    #[test]
    fn test_all_registers_zero_after_entry() {
        let mut dev = Device::new(Memory::new(), SimBoard::running());
        for index in 0..100u8 {
            dev.cpu.regs.set(index, 1000 + index as u16);
        }
        dev.cpu.regs.point(42);
        assert_eq!(dev.enter_running_mode(), RunOutcome::Terminated { steps: 0 });
        assert!(dev.cpu.regs.values().iter().all(|&v| v == 0));
        assert_eq!(dev.cpu.regs.values().len(), 100);
        assert_eq!(dev.cpu.regs.pointer, 0);
    }

    #[test]
    fn test_registers_reset_on_entry() {
        let mut dev = device("INC 2\nPCH AB\nPCH C", SimBoard::running());
        dev.enter_running_mode();
        dev.enter_running_mode();
        assert_eq!(dev.cpu.regs.get(0), 2);
        assert_eq!(dev.cpu.regs.output, 3);
        assert_eq!(dev.board.writes.last(), Some(&(b"C\0\0".to_vec(), 2, 0)));
    }

    #[test]
    fn test_error_shows_position() {
        let mut dev = device("CLR\nPIC 4\n", SimBoard::running());
        let outcome = dev.enter_running_mode();
        assert!(matches!(
            outcome,
            RunOutcome::Faulted { error: CpuError::OperandMismatch { position: 1, .. } }
        ));
        assert_eq!(dev.board.notices.last(), Some(&Notice::Error(1)));
        assert_eq!(dev.board.screen.line(1).trim(), "LINE 001");
        assert_eq!(dev.last_run(), Some(&outcome));
    }

    #[test]
    fn test_wait_interrupted_by_mode_switch() {
        let mut dev = device("WAI 50\nLD1 R\n", SimBoard::running_for(5));
        let outcome = dev.enter_running_mode();
        assert_eq!(outcome, RunOutcome::Interrupted { steps: 1 });
        assert_eq!(dev.board.elapsed_tenths, 3);
        assert_eq!(dev.board.leds[0], LedColour::Off);
        assert!(!dev.board.notices.contains(&Notice::Terminated));
    }

    #[test]
    fn test_step_limit() {
        let mut dev = device("INC 1\nJUM 0\n", SimBoard::running()).with_step_limit(100);
        assert_eq!(dev.enter_running_mode(), RunOutcome::StepLimit { steps: 100 });
        assert_eq!(dev.cpu.regs.get(0), 50);
    }

    #[test]
    fn test_trace_sees_every_step() {
        let mut dev = device("PIC R3\nSET 9\nINC 1\n", SimBoard::running());
        let mut seen = Vec::new();
        dev.run_traced(|step, regs| seen.push((step.position, regs.pointed())));
        assert_eq!(seen, vec![(0, 0), (1, 9), (2, 10)]);
    }

    #[test]
    fn test_not_started_in_editing_mode() {
        let mut dev = device("CLR\n", SimBoard::with_mode(ModeScript::Hold { editing: true }));
        assert_eq!(dev.enter_running_mode(), RunOutcome::Interrupted { steps: 0 });
        assert!(dev.board.notices.is_empty());
    }

    #[test]
    fn test_editing_entry_silences_outputs() {
        let mut board = SimBoard::typing(b"");
        board.mode = ModeScript::Hold { editing: true };
        board.leds = [LedColour::Red, LedColour::Blue];
        board.power_budget = Some(3);
        let mut dev = device("CLR\nCLR\n", board);
        dev.enter_editing_mode();
        assert_eq!(dev.board.leds, [LedColour::Off; 2]);
        assert_eq!(dev.board.tones, vec![Tone::Off]);
        assert_eq!(dev.board.notices, vec![Notice::Editing]);
        assert_eq!(dev.editor.position(), 2);
    }

    #[test]
    fn test_type_then_run() {
        let mut board = SimBoard::typing(b"PIC R0]SET 7]PTR R0]");
        board.power_budget = Some(40);
        let mut dev = Device::new(Memory::new(), board);
        dev.power_on();

        assert_eq!(dev.store.program(), &[
            Instruction::with_register(Opcode::Pic, 0),
            Instruction::with_literal(Opcode::Set, 7),
            Instruction::with_register(Opcode::Ptr, 0),
        ]);
        assert_eq!(dev.last_run(), Some(&RunOutcome::Terminated { steps: 3 }));
        assert!(dev.board.written_text().contains("007"));
        assert_eq!(dev.board.notices, vec![Notice::Editing, Notice::Running, Notice::Terminated]);
    }

    #[test]
    fn test_power_on_reports_each_mode() {
        let mut board = SimBoard::typing(b"XYZ]PIC R1]INC 4]");
        board.power_budget = Some(60);
        let mut dev = Device::new(Memory::new(), board);
        let mut traced = Vec::new();
        let mut reports = Vec::new();
        dev.power_on_with(
            |step, regs| traced.push((step.position, regs.pointed())),
            |_, report| reports.push(match report {
                ModeReport::Rejected(_) => "rejected".to_string(),
                ModeReport::Ran(outcome) => format!("{:?}", outcome),
            }),
        );
        assert_eq!(traced, vec![(0, 0), (1, 4)]);
        assert_eq!(reports, vec!["Terminated { steps: 2 }".to_string()]);
    }

    #[test]
    fn test_power_on_reports_rejected_line() {
        let mut board = SimBoard::typing(b"XYZ]");
        board.power_budget = Some(30);
        let mut dev = Device::new(Memory::new(), board);
        let mut rejected = Vec::new();
        dev.power_on_with(|_, _| {}, |_, report| {
            if let ModeReport::Rejected(error) = report {
                rejected.push(error.clone());
            }
        });
        assert_eq!(rejected, vec![EditError::UnknownMnemonic(*b"XYZ")]);
    }

    #[test]
    fn test_rejected_line_is_reported() {
        let mut board = SimBoard::typing(b"ABC 1]");
        board.power_budget = Some(20);
        let mut dev = Device::new(Memory::new(), board);
        dev.enter_editing_mode();
        assert!(matches!(dev.last_edit(), Some(Err(EditError::UnknownMnemonic(_)))));
        assert!(dev.store.program().is_empty());
    }

    #[test]
    fn test_erase_program() {
        let mut dev = device("CLR\n", SimBoard::running());
        dev.erase_program();
        assert!(dev.store.program().is_empty());
    }
}
