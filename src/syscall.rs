//! Host handling of guest environment calls
//!
//! Translated code calls [`host_ecall`] whenever the guest executes
//! ecall, with the syscall number in a7 and arguments in a0..a2
//! (the RISC-V Linux calling convention). Two calls are handled:
//! exit, which records a pending exit code for the dispatch loop to
//! pick up, and write to stdout or stderr. Everything else fails
//! with -1 in a0 and execution continues.

use std::cell::Cell;
use std::io::Write;

use crate::cpu::CpuState;

pub const SYS_WRITE: u32 = 64;
pub const SYS_EXIT: u32 = 93;

thread_local! {
    static PENDING_EXIT: Cell<Option<i32>> = const { Cell::new(None) };
}

/// Take the exit code recorded by a guest exit call, if any. The
/// dispatch loop polls this after every block invocation.
pub fn take_exit() -> Option<i32> {
    PENDING_EXIT.with(Cell::take)
}

fn write_out(state: &CpuState, fd: u32, buf: u32, len: u32) -> u32 {
    let image = unsafe { &*state.memory };
    let mut bytes = Vec::with_capacity(len as usize);
    for offset in 0..len {
        match image.read8(buf.wrapping_add(offset)) {
            Some(byte) => bytes.push(byte),
            None => return u32::MAX,
        }
    }
    let result = match fd {
        1 => std::io::stdout().write_all(&bytes),
        2 => std::io::stderr().write_all(&bytes),
        _ => return u32::MAX,
    };
    match result {
        Ok(()) => len,
        Err(_) => u32::MAX,
    }
}

pub(crate) extern "C" fn host_ecall(state: *mut CpuState) {
    let state = unsafe { &mut *state };
    let number = state.registers[17];
    let (a0, a1, a2) =
        (state.registers[10], state.registers[11], state.registers[12]);
    match number {
        SYS_EXIT => {
            tracing::debug!("guest exit with code {}", a0 as i32);
            PENDING_EXIT.with(|cell| cell.set(Some(a0 as i32)));
        }
        SYS_WRITE => {
            state.registers[10] = write_out(state, a0, a1, a2);
        }
        _ => {
            tracing::debug!("unhandled guest syscall {number}");
            state.registers[10] = u32::MAX;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryImage;

    #[test]
    fn exit_call_records_pending_exit() {
        let mut image = MemoryImage::new();
        let mut state = CpuState::new(&mut image, 0x1000);
        state.registers[17] = SYS_EXIT;
        state.registers[10] = 7;

        assert_eq!(take_exit(), None);
        host_ecall(&mut state);
        assert_eq!(take_exit(), Some(7));
        // The code is consumed by take_exit
        assert_eq!(take_exit(), None);
    }

    #[test]
    fn unknown_syscall_fails_with_minus_one() {
        let mut image = MemoryImage::new();
        let mut state = CpuState::new(&mut image, 0x1000);
        state.registers[17] = 1234;
        state.registers[10] = 0;

        host_ecall(&mut state);
        assert_eq!(state.registers[10], u32::MAX);
        assert_eq!(take_exit(), None);
    }
}
