//! The character display.
//!
//! The device has a 128x32 pixel panel driven as 16 columns by 2 rows of
//! double-height characters, plus a pointer marker at the right edge used by
//! the editor. [`TextDisplay`] keeps the character grid in memory.

use serde::{Serialize, Deserialize};

/// Characters per row.
pub const COLUMNS: usize = 16;

/// Text rows.
pub const ROWS: usize = 2;

/// Display operations used by the interpreter and the editor.
pub trait Screen {
    /// Write `bytes` starting at (`column`, `row`), wrapping to the next row
    /// past the last column. NUL bytes render as blanks.
    fn write_string(&mut self, bytes: &[u8], column: usize, row: usize) {
        for (i, &b) in bytes.iter().enumerate() {
            let offset = column + i;
            self.write_char(b, offset % COLUMNS, row + offset / COLUMNS);
        }
    }

    /// Write one character. Positions outside the grid are ignored.
    fn write_char(&mut self, ch: u8, column: usize, row: usize);

    /// Blank the whole display, including the pointer.
    fn clear(&mut self);

    /// Move the pointer marker to `row`.
    fn draw_pointer(&mut self, row: usize);

    /// Keep the current screen visible for `millis` milliseconds.
    fn hold(&mut self, _millis: u64) {}

    fn show_editing_message(&mut self) {
        self.clear();
        self.write_string(b"PROGRAMMING", 2, 0);
        self.hold(500);
        self.clear();
    }

    fn show_running_message(&mut self) {
        self.clear();
        self.write_string(b"RUNNING", 4, 0);
        self.hold(500);
        self.clear();
    }

    fn show_terminated_message(&mut self) {
        self.clear();
        self.write_string(b"PROGRAM", 4, 0);
        self.write_string(b"TERMINATED", 3, 1);
        self.hold(500);
    }

    /// Report an error at program `position`.
    fn show_error_message(&mut self, position: usize) {
        let line = format!("LINE {:03}", position);
        self.clear();
        self.write_string(b"ERROR IN", 3, 0);
        self.write_string(line.as_bytes(), 3, 1);
    }
}

/// In-memory character grid.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDisplay {
    cells: [[u8; COLUMNS]; ROWS],
    pointer: Option<usize>,
}

impl TextDisplay {
    /// Create a blank display.
    pub fn new() -> Self {
        Self {
            cells: [[b' '; COLUMNS]; ROWS],
            pointer: None,
        }
    }

    /// The text of one row.
    pub fn line(&self, row: usize) -> String {
        self.cells[row].iter().map(|&b| b as char).collect()
    }

    /// Both rows.
    pub fn lines(&self) -> [String; ROWS] {
        [self.line(0), self.line(1)]
    }

    /// The row carrying the pointer marker.
    pub fn pointer(&self) -> Option<usize> {
        self.pointer
    }

    /// True if nothing but blanks is shown.
    pub fn is_blank(&self) -> bool {
        self.pointer.is_none() && self.cells.iter().flatten().all(|&b| b == b' ')
    }
}

impl Screen for TextDisplay {
    fn write_char(&mut self, ch: u8, column: usize, row: usize) {
        if row < ROWS && column < COLUMNS {
            self.cells[row][column] = if ch == 0 { b' ' } else { ch };
        }
    }

    fn clear(&mut self) {
        self.cells = [[b' '; COLUMNS]; ROWS];
        self.pointer = None;
    }

    fn draw_pointer(&mut self, row: usize) {
        self.pointer = (row < ROWS).then_some(row);
    }
}

impl Default for TextDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextDisplay")
            .field("lines", &self.lines())
            .field("pointer", &self.pointer)
            .finish()
    }
}

impl std::fmt::Display for TextDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..ROWS {
            let marker = if self.pointer == Some(row) { '<' } else { ' ' };
            writeln!(f, "|{}|{}", self.line(row), marker)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_string() {
        let mut display = TextDisplay::new();
        display.write_string(b"HEL", 2, 0);
        assert_eq!(display.line(0), "  HEL           ");
    }

    #[test]
    fn test_nul_renders_blank() {
        let mut display = TextDisplay::new();
        display.write_string(b"AB", 0, 0);
        display.write_string(b"\0C", 0, 0);
        assert_eq!(&display.line(0)[..2], " C");
    }

    #[test]
    fn test_wraps_to_next_row() {
        let mut display = TextDisplay::new();
        display.write_string(b"XYZ", 15, 0);
        assert_eq!(display.line(0).chars().last(), Some('X'));
        assert_eq!(&display.line(1)[..2], "YZ");
    }

    #[test]
    fn test_drops_past_last_row() {
        let mut display = TextDisplay::new();
        display.write_string(b"ABC", 31, 0);
        assert_eq!(display.line(1).chars().last(), Some('A'));
        display.write_char(b'Q', 0, 2);
        display.write_char(b'Q', 16, 0);
        assert_eq!(display.line(0).trim(), "");
    }

    #[test]
    fn test_clear_removes_pointer() {
        let mut display = TextDisplay::new();
        display.draw_pointer(1);
        assert_eq!(display.pointer(), Some(1));
        display.clear();
        assert!(display.is_blank());
    }

    #[test]
    fn test_error_message() {
        let mut display = TextDisplay::new();
        display.show_error_message(7);
        assert_eq!(display.line(0).trim(), "ERROR IN");
        assert_eq!(display.line(1).trim(), "LINE 007");
    }

    #[test]
    fn test_error_message_past_999() {
        let mut display = TextDisplay::new();
        display.show_error_message(1234);
        assert_eq!(display.line(1).trim(), "LINE 1234");
        display.show_error_message(4079);
        assert_eq!(display.line(1).trim(), "LINE 4079");
    }

    #[test]
    fn test_running_message_leaves_blank_screen() {
        let mut display = TextDisplay::new();
        display.write_string(b"OLD", 0, 0);
        display.show_running_message();
        assert!(display.is_blank());
    }
}
