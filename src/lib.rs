//! # Programmable Controller
//!
//! Control software for a small programmable controller: programs of
//! three-letter mnemonics are typed on an external keyboard, kept in a
//! fixed-size instruction store, and run to drive two RGB LEDs, a buzzer
//! and a two-row character display while reading push buttons and analog
//! inputs.
//!
//! - [`cpu`]: instruction encoding, store, registers and the interpreter
//! - [`editor`]: keystroke-driven program editing
//! - [`hal`]: the board collaborators and an in-memory simulation
//! - [`device`]: the mode loop tying it all together
//! - [`asm`]: listings, disassembly and program images

pub mod cpu;
pub mod hal;
pub mod editor;
pub mod device;
pub mod asm;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, InstructionStore, Memory, Registers, Instruction, Opcode};
pub use editor::{Editor, EditError};
pub use device::{Device, ModeReport, RunOutcome};
pub use hal::{Board, SimBoard};
pub use config::{DeviceConfig, ConfigError};
pub use asm::{assemble, disassemble, AssemblerError, ImageError, load_image, save_image};

#[cfg(feature = "tui")]
pub use tui::run_front_panel;
