//! Disassembler for controller programs.
//!
//! Renders instructions the way the editor previews them: `NNN : MNE ops`.

use crate::cpu::decode::Instruction;
use crate::cpu::opcode::opcode_to_mnemonic;

/// Render one preview line. Unknown opcodes show as `XXX`, NUL operand
/// bytes as blanks.
pub fn preview_line(position: usize, instr: &Instruction) -> Vec<u8> {
    let mut line = format!("{:03} : ", position).into_bytes();
    line.extend_from_slice(&opcode_to_mnemonic(instr.opcode));
    line.push(b' ');
    line.extend_from_slice(&instr.operand_text());
    line
}

/// Disassemble a single instruction to text.
pub fn disassemble_instruction(position: usize, instr: &Instruction) -> String {
    String::from_utf8_lossy(&preview_line(position, instr))
        .trim_end()
        .to_string()
}

/// Disassemble a program, one line per instruction.
pub fn disassemble(program: &[Instruction]) -> String {
    let mut output = String::new();
    output.push_str("; Program listing\n");
    output.push_str(&format!("; {} instructions\n\n", program.len()));

    for (position, instr) in program.iter().enumerate() {
        output.push_str(&disassemble_instruction(position, instr));
        output.push('\n');
    }

    output
}

/// Render a program as an assembler listing that reassembles to the same
/// instructions.
pub fn to_listing(program: &[Instruction]) -> String {
    program
        .iter()
        .map(|instr| format!("{}\n", instr))
        .collect()
}
