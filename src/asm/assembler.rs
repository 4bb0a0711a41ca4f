//! Listing assembler.
//!
//! A listing holds one instruction per line, written exactly as it would
//! be typed on the device keyboard:
//! ```text
//! ; Count button presses
//! PIC R0
//! INH 0      ; column 8 onwards is a comment
//! INC 1
//! PTR R0
//! JUM 1
//! ```
//! Columns 1-3 hold the mnemonic, column 4 a separator and columns 5-7 the
//! operand bytes. Leading whitespace is ignored; blank lines and lines
//! starting with `;` are skipped.

use crate::cpu::decode::Instruction;
use crate::cpu::memory::PROGRAM_CAPACITY;
use crate::editor::{parse_line, EditError, LINE_LEN};
use thiserror::Error;

/// Assemble a listing into a program.
pub fn assemble(source: &str) -> Result<Vec<Instruction>, AssemblerError> {
    let mut output = Vec::new();

    for (line_num, line) in source.lines().enumerate() {
        let Some(instr) = assemble_line(line, line_num + 1)? else {
            continue;
        };
        if output.len() == PROGRAM_CAPACITY {
            return Err(AssemblerError::ProgramTooLong {
                line: line_num + 1,
                capacity: PROGRAM_CAPACITY,
            });
        }
        output.push(instr);
    }

    Ok(output)
}

fn assemble_line(line: &str, line_num: usize) -> Result<Option<Instruction>, AssemblerError> {
    let line = line.trim_start().as_bytes();

    // Skip empty lines and comments
    if line.iter().all(u8::is_ascii_whitespace) || line[0] == b';' {
        return Ok(None);
    }

    let (code, rest) = line.split_at(line.len().min(LINE_LEN));

    // A comment may start inside the operand columns when preceded by blanks;
    // it runs to the end of the line
    let code = match code.windows(2).position(|w| w[0].is_ascii_whitespace() && w[1] == b';') {
        Some(i) if i >= 4 => &code[..i],
        _ => {
            let rest = String::from_utf8_lossy(rest);
            let rest = rest.trim();
            if !rest.is_empty() && !rest.starts_with(';') {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("unexpected text after operand: {:?}", rest),
                });
            }
            code
        }
    };
    let code = trim_trailing_blanks(code);

    match parse_line(code) {
        Ok(instr) => Ok(Some(instr)),
        Err(EditError::UnknownMnemonic(mnemonic)) => Err(AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: String::from_utf8_lossy(&mnemonic).into_owned(),
        }),
        Err(e) => Err(AssemblerError::SyntaxError {
            line: line_num,
            message: e.to_string(),
        }),
    }
}

fn trim_trailing_blanks(mut code: &[u8]) -> &[u8] {
    while let [head @ .., last] = code {
        if !last.is_ascii_whitespace() {
            break;
        }
        code = head;
    }
    code
}

/// Errors that can occur during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("program exceeds {capacity} instructions at line {line}")]
    ProgramTooLong { line: usize, capacity: usize },
}
