//! # Host stand-in port
//!
//! Lets the kernel build and run its unit tests on a development
//! machine. Frames are reserved but inert (host function pointers do
//! not fit the 32-bit frame words, and nothing ever resumes one), and
//! the crossings refuse to run: scheduler tests drive `dispatch` and
//! `handle_request` directly instead of context-switching.

use crate::task::TaskEntry;

use super::CONTEXT_WORDS;

pub fn timer_init() {}

pub fn interrupt_init() {}

pub fn read_subtick() -> u16 {
    0
}

pub fn enter_kernel() {
    unimplemented!("no kernel crossing on the host");
}

pub fn exit_kernel() {
    unimplemented!("no kernel crossing on the host");
}

/// Reserve and zero a frame-sized block at the aligned stack top, so
/// descriptor bookkeeping behaves exactly as on the target.
pub fn build_initial_frame(
    stack: &mut [u8],
    _entry: TaskEntry,
    _terminate: TaskEntry,
) -> *mut u32 {
    let top = (stack.as_mut_ptr() as usize + stack.len()) & !7;
    let frame = (top - CONTEXT_WORDS * 4) as *mut u32;
    unsafe {
        for i in 0..CONTEXT_WORDS {
            frame.add(i).write(0);
        }
    }
    frame
}

#[inline]
pub fn idle_wait() {
    core::hint::spin_loop();
}

pub fn delay_25ms() {}
