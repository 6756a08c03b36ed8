//! ELF program loading
//!
//! Reads a 32-bit little-endian RISC-V executable and builds the
//! guest memory image from its PT_LOAD segments. Each segment buffer
//! is sized to p_memsz and zero-filled past p_filesz, which covers
//! .bss without special handling. No relocations are applied; the
//! entry point is taken from the ELF header.

use std::path::Path;

use elf::abi::{EM_RISCV, PT_LOAD};
use elf::endian::AnyEndian;
use elf::file::Class;
use elf::ElfBytes;
use thiserror::Error;

use crate::memory::{MemoryImage, Segment};

#[derive(Debug, Error)]
pub enum ElfError {
    #[error("could not read elf file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse elf file: {0}")]
    Parse(#[from] elf::ParseError),
    #[error("expected an ELF32 file, found {0:?}")]
    WrongClass(Class),
    #[error("expected a RISC-V executable, found machine {0:#x}")]
    WrongMachine(u16),
    #[error("elf file has no program headers")]
    NoSegments,
    #[error("no PT_LOAD segment in elf file")]
    NoLoadableSegments,
}

/// Load an ELF executable from disk. Returns the populated memory
/// image (loadable segments plus the stack segment) and the entry
/// program counter.
pub fn load_elf(path: &Path) -> Result<(MemoryImage, u32), ElfError> {
    let file_data = std::fs::read(path)?;
    load_elf_bytes(&file_data)
}

/// Load an ELF executable already read into memory
pub fn load_elf_bytes(data: &[u8]) -> Result<(MemoryImage, u32), ElfError> {
    let file = ElfBytes::<AnyEndian>::minimal_parse(data)?;

    if file.ehdr.class != Class::ELF32 {
        return Err(ElfError::WrongClass(file.ehdr.class));
    }
    if file.ehdr.e_machine != EM_RISCV {
        return Err(ElfError::WrongMachine(file.ehdr.e_machine));
    }

    let segments = file.segments().ok_or(ElfError::NoSegments)?;

    let mut image = MemoryImage::new();
    let mut loaded = 0;
    for phdr in segments.iter().filter(|phdr| phdr.p_type == PT_LOAD) {
        let file_bytes = file.segment_data(&phdr)?;
        let mem_size = phdr.p_memsz as usize;
        let mut bytes = vec![0u8; mem_size];
        let copy_len = file_bytes.len().min(mem_size);
        bytes[..copy_len].copy_from_slice(&file_bytes[..copy_len]);
        tracing::debug!(
            "loading segment at 0x{:08x}, {} bytes ({} from file)",
            phdr.p_vaddr,
            mem_size,
            copy_len
        );
        image.push_segment(Segment::new(phdr.p_vaddr as u32, bytes));
        loaded += 1;
    }
    if loaded == 0 {
        return Err(ElfError::NoLoadableSegments);
    }

    image.push_stack_segment();
    Ok((image, file.ehdr.e_entry as u32))
}
