//! Program image files.
//!
//! An image is the raw persisted program: four bytes per record in the
//! order `d1 d2 d3 opcode`, starting at position 0. Trailing EMPTY records
//! are not written; loading pads the rest of the store with EMPTY.

use crate::cpu::decode::{Instruction, RECORD_SIZE};
use crate::cpu::memory::{InstructionStore, Memory, PROGRAM_CAPACITY};
use std::path::Path;
use thiserror::Error;

/// Decode image bytes into a full store.
pub fn image_from_bytes(bytes: &[u8]) -> Result<Memory, ImageError> {
    if bytes.len() % RECORD_SIZE != 0 {
        return Err(ImageError::Truncated { len: bytes.len() });
    }
    let records = bytes.len() / RECORD_SIZE;
    if records > PROGRAM_CAPACITY {
        return Err(ImageError::TooLarge { records, capacity: PROGRAM_CAPACITY });
    }

    let program: Vec<Instruction> = bytes
        .chunks_exact(RECORD_SIZE)
        .map(|chunk| Instruction::from_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let mut mem = Memory::new();
    mem.load_program(0, &program)
        .map_err(|_| ImageError::TooLarge { records, capacity: PROGRAM_CAPACITY })?;
    Ok(mem)
}

/// Encode a store up to its last non-EMPTY record.
pub fn image_to_bytes<S: InstructionStore + ?Sized>(store: &S) -> Result<Vec<u8>, ImageError> {
    let mut records = Vec::new();
    for pos in 0..store.capacity() {
        records.push(store.get(pos).map_err(|e| ImageError::Io(e.to_string()))?);
    }
    let used = records
        .iter()
        .rposition(|instr| !instr.is_empty())
        .map_or(0, |last| last + 1);

    Ok(records[..used].iter().flat_map(Instruction::to_bytes).collect())
}

/// Load an image file.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Memory, ImageError> {
    let bytes = std::fs::read(path.as_ref())
        .map_err(|e| ImageError::Io(e.to_string()))?;
    image_from_bytes(&bytes)
}

/// Save a store as an image file.
pub fn save_image<P: AsRef<Path>, S: InstructionStore + ?Sized>(path: P, store: &S) -> Result<(), ImageError> {
    let bytes = image_to_bytes(store)?;
    std::fs::write(path.as_ref(), bytes)
        .map_err(|e| ImageError::Io(e.to_string()))
}

/// Errors that can occur while reading or writing images.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image length {len} is not a whole number of records")]
    Truncated { len: usize },

    #[error("image holds {records} records, the store holds {capacity}")]
    TooLarge { records: usize, capacity: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::opcode::Opcode;

    #[test]
    fn test_record_byte_order() {
        let mem = Memory::from_program(&[Instruction::new(Opcode::Pch, *b"ABC")]).unwrap();
        assert_eq!(image_to_bytes(&mem).unwrap(), vec![b'A', b'B', b'C', Opcode::Pch as u8]);
    }

    #[test]
    fn test_load_pads_with_empty() {
        let bytes = [b'5', 0, 0, Opcode::Set as u8];
        let mem = image_from_bytes(&bytes).unwrap();
        assert_eq!(mem.capacity(), PROGRAM_CAPACITY);
        assert_eq!(mem.program(), &[Instruction::with_literal(Opcode::Set, 5)]);
        assert_eq!(mem.get(1), Ok(Instruction::EMPTY));
    }

    #[test]
    fn test_keeps_records_after_gap() {
        let mut mem = Memory::new();
        mem.put(2, Instruction::bare(Opcode::Clr)).unwrap();
        let bytes = image_to_bytes(&mem).unwrap();
        assert_eq!(bytes.len(), 3 * RECORD_SIZE);
        assert_eq!(image_from_bytes(&bytes).unwrap(), mem);
    }

    #[test]
    fn test_empty_store() {
        assert!(image_to_bytes(&Memory::new()).unwrap().is_empty());
        assert_eq!(image_from_bytes(&[]).unwrap(), Memory::new());
    }

    #[test]
    fn test_rejects_partial_record() {
        assert_eq!(image_from_bytes(&[1, 2, 3]), Err(ImageError::Truncated { len: 3 }));
    }

    #[test]
    fn test_rejects_oversized_image() {
        let bytes = vec![0u8; (PROGRAM_CAPACITY + 1) * RECORD_SIZE];
        assert_eq!(
            image_from_bytes(&bytes),
            Err(ImageError::TooLarge { records: PROGRAM_CAPACITY + 1, capacity: PROGRAM_CAPACITY })
        );
    }

    #[test]
    fn test_file_roundtrip() {
        let mem = Memory::from_program(&[
            Instruction::with_register(Opcode::Pic, 4),
            Instruction::with_literal(Opcode::Inc, 250),
        ])
        .unwrap();
        let path = std::env::temp_dir().join(format!("pcd-image-{}.bin", std::process::id()));
        save_image(&path, &mem).unwrap();
        let loaded = load_image(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, mem);
    }
}
