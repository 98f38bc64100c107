//! # Architecture ports
//!
//! The hardware boundary of the kernel. A port supplies exactly six
//! things: initial stack-frame fabrication, the two kernel-boundary
//! crossings (`enter_kernel` from a task, `exit_kernel` from the
//! dispatcher loop), tick-timer setup, the sub-tick cycle reading for
//! millisecond time, and small idle/delay primitives.
//!
//! The Cortex-M4 port is the real one. The host port exists so the
//! scheduler, queues, and services build and run under `cargo test` on
//! a development machine: it fabricates inert frames and refuses to
//! context-switch.

/// Words in one saved context frame, identical for tasks and for the
/// kernel: the saved interrupt-mask word, an alignment pad, the eight
/// callee-saved registers, then the eight-word hardware exception frame.
pub const CONTEXT_WORDS: usize = 18;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4::{
    build_initial_frame, delay_25ms, enter_kernel, exit_kernel, idle_wait, interrupt_init,
    read_subtick, timer_init,
};

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub mod host;
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub use host::{
    build_initial_frame, delay_25ms, enter_kernel, exit_kernel, idle_wait, interrupt_init,
    read_subtick, timer_init,
};
