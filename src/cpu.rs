//! Guest CPU state
//!
//! The CPU state is shared directly with translated code, which
//! indexes into it by field offset. Its layout is therefore part of
//! the ABI between this crate and the code it generates: C layout,
//! register file first, then the program counter, then the memory
//! pointer. The emitter builds the matching LLVM struct type in
//! [`crate::translate`]; the assertions below pin the Rust side of
//! the contract.

use std::fmt;
use std::mem;

use itertools::Itertools;

use crate::memory::MemoryImage;

/// Number of integer registers in RV32I
pub const REG_COUNT: usize = 32;

/// Stack pointer register index (sp = x2)
pub const REG_SP: usize = 2;

/// Initial stack pointer, 16 bytes below the top of the stack segment
pub const STACK_TOP: u32 = 0xffff_fff0;

/// Register and program counter state of the guest hart, plus the
/// memory it executes from
///
/// `memory` is a raw pointer because translated code passes it to the
/// memory helpers; the caller keeps the [`MemoryImage`] alive and
/// un-moved for as long as this state (or any block invoked with it)
/// can reach it.
#[derive(Debug)]
#[repr(C)]
pub struct CpuState {
    pub registers: [u32; REG_COUNT],
    pub pc: u32,
    pub memory: *mut MemoryImage,
}

// Offsets assumed by the code emitter
const _: () = assert!(mem::offset_of!(CpuState, registers) == 0);
const _: () = assert!(mem::offset_of!(CpuState, pc) == 4 * REG_COUNT);
const _: () = {
    let ptr_align = mem::align_of::<*mut MemoryImage>();
    let after_pc = 4 * REG_COUNT + 4;
    let expected = (after_pc + ptr_align - 1) / ptr_align * ptr_align;
    assert!(mem::offset_of!(CpuState, memory) == expected);
};

impl CpuState {
    /// Reset state at the given entry point: all registers zero
    /// except sp, which points just under the top of the stack
    /// segment.
    pub fn new(memory: &mut MemoryImage, pc: u32) -> Self {
        let mut registers = [0; REG_COUNT];
        registers[REG_SP] = STACK_TOP;
        Self {
            registers,
            pc,
            memory,
        }
    }
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let non_zero = self
            .registers
            .iter()
            .enumerate()
            .filter(|(_, value)| **value != 0)
            .map(|(n, value)| format!("x{n}=0x{value:x}"))
            .join(" ");
        write!(f, "pc=0x{:x} {non_zero}", self.pc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryImage;

    #[test]
    fn reset_state() {
        let mut image = MemoryImage::new();
        let state = CpuState::new(&mut image, 0x1000);
        assert_eq!(state.pc, 0x1000);
        assert_eq!(state.registers[REG_SP], 0xffff_fff0);
        let others = state
            .registers
            .iter()
            .enumerate()
            .filter(|(n, _)| *n != REG_SP);
        for (_, value) in others {
            assert_eq!(*value, 0);
        }
    }

    #[test]
    fn dump_shows_pc_and_non_zero_registers() {
        let mut image = MemoryImage::new();
        let mut state = CpuState::new(&mut image, 0x1000);
        state.registers[1] = 5;
        let dump = state.to_string();
        assert!(dump.starts_with("pc=0x1000"));
        assert!(dump.contains("x1=0x5"));
        assert!(!dump.contains("x3="));
    }
}
