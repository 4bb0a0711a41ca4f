//! Program editor.
//!
//! In editing mode the device reads one key at a time. Typed characters
//! collect in a seven-character line (`MNE ops`) echoed on the display;
//! control keys write the line into the program, move the position, or
//! open and close gaps in the program. After every structural key the
//! two-line preview is redrawn.

use crate::asm::disasm::preview_line;
use crate::cpu::decode::Instruction;
use crate::cpu::memory::{InstructionStore, StoreError};
use crate::cpu::opcode::{mnemonic_to_opcode, Opcode};
use crate::hal::{Screen, COLUMNS};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Characters in a typed line: mnemonic, separator, three operand bytes.
pub const LINE_LEN: usize = 7;

/// Display column of the first typed character.
const ECHO_COLUMN: usize = 6;

/// Columns blanked when a new line is started.
const ECHO_BLANK: usize = 9;

/// A key as the editor interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    /// `]`: write the line and move down.
    Confirm,
    /// `^`: move up.
    Up,
    /// `.`: open an EMPTY gap at the position.
    Insert,
    /// `,`: delete the instruction at the position.
    Delete,
    /// `<`: erase the last typed character.
    Backspace,
    Char(u8),
}

impl Key {
    pub fn from_byte(b: u8) -> Self {
        match b {
            b']' => Key::Confirm,
            b'^' => Key::Up,
            b'.' => Key::Insert,
            b',' => Key::Delete,
            b'<' => Key::Backspace,
            _ => Key::Char(b),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Key::Confirm => b']',
            Key::Up => b'^',
            Key::Insert => b'.',
            Key::Delete => b',',
            Key::Backspace => b'<',
            Key::Char(b) => b,
        }
    }

    /// Keys after which the line is discarded and the preview redrawn.
    pub fn is_structural(self) -> bool {
        matches!(self, Key::Confirm | Key::Up | Key::Insert | Key::Delete)
    }
}

/// What a key did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// A character was added to the line.
    Typed,
    /// The last character was erased.
    Erased,
    /// Nothing changed (line full, nothing to erase, already at the top).
    Ignored,
    /// An instruction was written at `position`.
    Written { position: usize, instruction: Instruction },
    /// An empty line was confirmed; the position moved to `position`.
    Moved { position: usize },
    Inserted { position: usize },
    Deleted { position: usize },
}

/// Editor state: the program position and the line being typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Editor {
    position: usize,
    line: [u8; LINE_LEN],
    len: usize,
}

impl Editor {
    pub fn new() -> Self {
        Self {
            position: 0,
            line: [0; LINE_LEN],
            len: 0,
        }
    }

    /// Position the editor at the end of the program and draw the preview.
    pub fn begin<S, D>(&mut self, store: &S, screen: &mut D)
    where
        S: InstructionStore + ?Sized,
        D: Screen + ?Sized,
    {
        self.position = last_editable(store);
        self.clear_line();
        self.redraw(store, screen);
    }

    /// The instruction position being edited.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The characters typed so far.
    pub fn line(&self) -> &[u8] {
        &self.line[..self.len]
    }

    /// Display row carrying the edited instruction.
    pub fn row(&self) -> usize {
        (self.position != 0) as usize
    }

    /// Process one key.
    ///
    /// A rejected line is reported as an error; the program and position
    /// are left untouched, the line is discarded and the preview redrawn.
    pub fn handle_key<S, D>(&mut self, byte: u8, store: &mut S, screen: &mut D) -> Result<EditOutcome, EditError>
    where
        S: InstructionStore + ?Sized,
        D: Screen + ?Sized,
    {
        let key = Key::from_byte(byte);
        let result = match key {
            Key::Confirm => self.confirm(store),
            Key::Up => Ok(self.move_up()),
            Key::Insert => store
                .insert_empty(self.position)
                .map(|()| EditOutcome::Inserted { position: self.position })
                .map_err(EditError::from),
            Key::Delete => store
                .remove(self.position)
                .map(|()| EditOutcome::Deleted { position: self.position })
                .map_err(EditError::from),
            Key::Backspace => Ok(self.erase(screen)),
            Key::Char(ch) => Ok(self.type_char(ch, screen)),
        };

        if key.is_structural() {
            self.clear_line();
            self.redraw(&*store, screen);
        }
        result
    }

    fn confirm<S: InstructionStore + ?Sized>(&mut self, store: &mut S) -> Result<EditOutcome, EditError> {
        if self.len == 0 {
            self.position = (self.position + 1).min(tail_end(&*store));
            return Ok(EditOutcome::Moved { position: self.position });
        }

        let instruction = parse_line(self.line())?;
        let position = self.position;
        store.put(position, instruction)?;
        self.position = (position + 1).min(store.capacity().saturating_sub(1));
        Ok(EditOutcome::Written { position, instruction })
    }

    fn move_up(&mut self) -> EditOutcome {
        if self.position == 0 {
            return EditOutcome::Ignored;
        }
        self.position -= 1;
        EditOutcome::Moved { position: self.position }
    }

    fn type_char<D: Screen + ?Sized>(&mut self, ch: u8, screen: &mut D) -> EditOutcome {
        let row = self.row();
        if self.len == 0 {
            for column in ECHO_COLUMN..(ECHO_COLUMN + ECHO_BLANK).min(COLUMNS) {
                screen.write_char(b' ', column, row);
            }
        }
        if self.len >= LINE_LEN {
            return EditOutcome::Ignored;
        }
        self.line[self.len] = ch;
        screen.write_char(ch, ECHO_COLUMN + self.len, row);
        self.len += 1;
        EditOutcome::Typed
    }

    fn erase<D: Screen + ?Sized>(&mut self, screen: &mut D) -> EditOutcome {
        if self.len == 0 {
            return EditOutcome::Ignored;
        }
        self.len -= 1;
        self.line[self.len] = 0;
        screen.write_char(b' ', ECHO_COLUMN + self.len, self.row());
        EditOutcome::Erased
    }

    fn clear_line(&mut self) {
        self.line = [0; LINE_LEN];
        self.len = 0;
    }

    /// Draw the instruction before the position and the one at it, with
    /// the pointer on the edited row. At position 0 the first two
    /// instructions are shown with the pointer on the top row.
    pub fn redraw<S, D>(&self, store: &S, screen: &mut D)
    where
        S: InstructionStore + ?Sized,
        D: Screen + ?Sized,
    {
        screen.clear();
        let top = self.position - self.row();
        for row in 0..2 {
            let position = top + row;
            if let Ok(instruction) = store.get(position) {
                screen.write_string(&preview_line(position, &instruction), 0, row);
            }
        }
        screen.draw_pointer(self.row());
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

/// The furthest position the editor may move to: the first EMPTY slot, or
/// the last slot of a full program.
fn last_editable<S: InstructionStore + ?Sized>(store: &S) -> usize {
    store.program_end().min(store.capacity().saturating_sub(1))
}

/// The slot after the last instruction, looking past EMPTY gaps opened
/// inside the program, or the last slot of a full program.
fn tail_end<S: InstructionStore + ?Sized>(store: &S) -> usize {
    let end = (0..store.capacity())
        .rev()
        .find(|&pos| matches!(store.get(pos), Ok(instr) if !instr.is_empty()))
        .map_or(0, |pos| pos + 1);
    end.min(store.capacity().saturating_sub(1))
}

/// Parse a typed line into an instruction.
///
/// The first three bytes name the mnemonic (letters are upper-cased), the
/// fourth is a separator and bytes five to seven are the operand, taken
/// verbatim. Missing bytes are NUL.
pub fn parse_line(line: &[u8]) -> Result<Instruction, EditError> {
    if line.len() > LINE_LEN {
        return Err(EditError::LineTooLong(line.len()));
    }
    let mut padded = [0u8; LINE_LEN];
    padded[..line.len()].copy_from_slice(line);

    let mut mnemonic = [0u8; 3];
    mnemonic.copy_from_slice(&padded[..3]);
    if mnemonic.iter().all(|&b| b == 0 || b == b' ') {
        return Err(EditError::MissingMnemonic);
    }
    let mnemonic = mnemonic.map(|b| b.to_ascii_uppercase());

    let opcode = match mnemonic_to_opcode(mnemonic) {
        Some(Opcode::Empty) | None => return Err(EditError::UnknownMnemonic(mnemonic)),
        Some(opcode) => opcode,
    };

    let mut operands = [0u8; 3];
    operands.copy_from_slice(&padded[4..]);
    Ok(Instruction::new(opcode, operands))
}

/// Errors raised while editing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("unknown mnemonic {:?}", String::from_utf8_lossy(.0))]
    UnknownMnemonic([u8; 3]),

    #[error("line has no mnemonic")]
    MissingMnemonic,

    #[error("line is {0} characters long, at most 7 fit")]
    LineTooLong(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}
