//! # Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! compile time — no dynamic allocation, ever.

/// Maximum number of application tasks alive at once. Bounds the static
/// descriptor table; one extra slot is reserved for the idle task.
pub const MAX_TASKS: usize = 8;

/// Total descriptor slots, including the reserved idle slot.
pub const TOTAL_TASKS: usize = MAX_TASKS + 1;

/// Index of the idle task's descriptor. The idle task lives in the last
/// slot and is never on any queue.
pub const IDLE_INDEX: usize = MAX_TASKS;

/// Number of service (publish/subscribe) slots. Services are handed out
/// in order and never freed.
pub const MAX_SERVICES: usize = 4;

/// Per-task stack size in bytes. Must cover the deepest call chain plus
/// one full saved context (`arch::CONTEXT_WORDS` words).
pub const STACK_SIZE: usize = 1024;

/// Scheduler tick period in milliseconds.
pub const TICK_MS: u16 = 5;

/// Tick period expressed in timer cycles. The port scales its tick timer
/// so that one cycle is one microsecond.
pub const TICK_CYCLES: u16 = 5000;

/// Sub-tick thresholds for millisecond timekeeping: a cycle count below
/// `MS_CYCLES` is still in the first millisecond of the tick, below
/// `MS_CYCLES2` in the second, and so on.
pub const MS_CYCLES: u16 = 1000;
pub const MS_CYCLES2: u16 = 2000;
pub const MS_CYCLES3: u16 = 3000;
pub const MS_CYCLES4: u16 = 4000;

/// System clock frequency in Hz (STM32F4 on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;

/// Core clock cycles per timer cycle (microsecond).
pub const CYCLES_PER_US: u32 = SYSTEM_CLOCK_HZ / 1_000_000;
