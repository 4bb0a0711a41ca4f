//! Program files.
//!
//! This module provides:
//! - A listing assembler (typed lines → instructions)
//! - A disassembler (instructions → preview-style text)
//! - Binary program images in the persisted record layout

pub mod assembler;
pub mod disasm;
pub mod image;

pub use assembler::{assemble, AssemblerError};
pub use disasm::{disassemble, preview_line, to_listing};
pub use image::{image_from_bytes, image_to_bytes, load_image, save_image, ImageError};
