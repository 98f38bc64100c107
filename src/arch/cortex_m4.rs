//! # Cortex-M4 port
//!
//! Hardware-specific half of the kernel: context switching, the tick
//! timer, and the exception plumbing that carries a task into the
//! kernel and back.
//!
//! ## Stack model
//!
//! The kernel is the reset thread and owns **MSP**; every task runs
//! privileged in thread mode on **PSP**, on a stack inside its own
//! descriptor. While a task runs, the kernel's saved context sits on
//! the main stack and MSP itself banks the kernel stack pointer — no
//! separate saved-SP word is needed for the kernel side.
//!
//! ## Canonical frame
//!
//! Both crossings save the same 18-word frame, and task creation
//! fabricates one byte-identically, so a freshly created task and a
//! preempted one are indistinguishable to the restore path:
//!
//! ```text
//! saved sp ─► BASEPRI      saved interrupt-mask word
//!             (pad)        keeps the frame a multiple of 8 bytes
//!             r4 … r11     callee-saved registers
//!             r0 … r3      ┐
//!             r12, lr      │ hardware exception frame
//!             pc, xPSR     ┘
//! ```
//!
//! ## Crossings
//!
//! `enter_kernel` and `exit_kernel` both execute `svc`; the `SVCall`
//! handler reads EXC_RETURN bit 2 to learn which stack the thread was
//! on and switches to the other side. The tick interrupt performs the
//! same save as a syscall entry, except that the mask word is written
//! as zero outright: the interrupted task always runs unmasked, and
//! recording anything else would resume it with its tick shut off.
//!
//! The kernel runs with `BASEPRI` at the kernel mask, so the tick can
//! never fire between `handle_request` and the next `exit_kernel`;
//! `SVCall` sits at priority zero and is always deliverable. Floating
//! point state is not stacked — build for the soft-float ABI.

use core::arch::naked_asm;

use crate::config::{CYCLES_PER_US, TICK_CYCLES};
use crate::kernel::KernelRequest;
use crate::task::TaskEntry;

use super::CONTEXT_WORDS;

// ---------------------------------------------------------------------------
// System control registers
// ---------------------------------------------------------------------------

/// SysTick control/status, reload, and current-value registers.
const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
const SYST_RVR: *mut u32 = 0xE000_E014 as *mut u32;
const SYST_CVR: *mut u32 = 0xE000_E018 as *mut u32;

/// System handler priority registers: SHPR2 holds the SVCall priority
/// in bits [31:24], SHPR3 the SysTick priority in bits [31:24].
const SHPR2: *mut u32 = 0xE000_ED1C as *mut u32;
const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;

/// SysTick reload for one tick, in core clock cycles.
const TICK_RELOAD: u32 = TICK_CYCLES as u32 * CYCLES_PER_US - 1;

// ---------------------------------------------------------------------------
// Timer and priority setup
// ---------------------------------------------------------------------------

/// Program SysTick to fire once per tick from the core clock.
pub fn timer_init() {
    unsafe {
        core::ptr::write_volatile(SYST_RVR, TICK_RELOAD);
        core::ptr::write_volatile(SYST_CVR, 0);
        // ENABLE | TICKINT | CLKSOURCE
        core::ptr::write_volatile(SYST_CSR, 0b111);
    }
}

/// Put SVCall at the highest priority and SysTick below the kernel
/// mask, so a masked section shuts out the tick but never the
/// system-call path.
pub fn interrupt_init() {
    unsafe {
        let v = core::ptr::read_volatile(SHPR2) & 0x00FF_FFFF;
        core::ptr::write_volatile(SHPR2, v); // SVCall = 0x00
        let v = core::ptr::read_volatile(SHPR3) & 0x00FF_FFFF;
        core::ptr::write_volatile(SHPR3, v | (0xF0 << 24)); // SysTick = 0xF0
    }
}

/// Core clock cycles elapsed since the last tick, scaled to timer
/// cycles (microseconds). Feeds the sub-tick millisecond correction.
pub fn read_subtick() -> u16 {
    let current = unsafe { core::ptr::read_volatile(SYST_CVR) };
    ((TICK_RELOAD.wrapping_sub(current)) / CYCLES_PER_US) as u16
}

// ---------------------------------------------------------------------------
// Kernel crossings
// ---------------------------------------------------------------------------

/// Suspend the calling task and hand the processor to the kernel.
/// Preconditions: running on the task stack with the kernel mask
/// raised and the request slot written. Returns when the kernel next
/// dispatches this task.
#[inline]
pub fn enter_kernel() {
    unsafe { core::arch::asm!("svc 0") };
}

/// Suspend the kernel and resume the current task. Called only from
/// the dispatcher loop; returns on the next kernel entry.
#[inline]
pub fn exit_kernel() {
    unsafe { core::arch::asm!("svc 0") };
}

/// The system-call exception. Both crossing directions meet here;
/// EXC_RETURN bit 2 says which stack the interrupted thread was on.
#[unsafe(naked)]
#[no_mangle]
pub unsafe extern "C" fn SVCall() {
    naked_asm!(
        "tst lr, #4",
        "beq 2f",
        // --- task -> kernel ---
        // complete the canonical frame on the task stack
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        "mrs r1, basepri",
        "movs r2, #0",
        "stmdb r0!, {{r1, r2}}",
        "bl {save_sp}",
        // unbank the kernel context from the main stack
        "ldmia sp!, {{r1, r2}}",
        "msr basepri, r1",
        "ldmia sp!, {{r4-r11}}",
        "mvn lr, #6", // EXC_RETURN 0xFFFFFFF9: thread mode, main stack
        "bx lr",
        // --- kernel -> task ---
        "2:",
        "stmdb sp!, {{r4-r11}}",
        "mrs r1, basepri",
        "movs r2, #0",
        "stmdb sp!, {{r1, r2}}",
        // MSP now banks the kernel stack pointer until the next entry
        "bl {load_sp}",
        "ldmia r0!, {{r1, r2}}",
        "msr basepri, r1",
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        "mvn lr, #2", // EXC_RETURN 0xFFFFFFFD: thread mode, process stack
        "bx lr",
        save_sp = sym trios_save_task_sp,
        load_sp = sym trios_load_task_sp,
    );
}

/// The tick interrupt. Arrives only while a task runs (the kernel
/// keeps it masked), so this is always a task -> kernel crossing: the
/// same save as a syscall, a `TimerExpired` request, then the kernel
/// resumes inside its main loop.
#[unsafe(naked)]
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    naked_asm!(
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        // the interrupted task always runs unmasked; store that, not
        // whatever the exception entry left in basepri
        "movs r1, #0",
        "movs r2, #0",
        "stmdb r0!, {{r1, r2}}",
        "bl {save_sp}",
        "bl {tick}",
        "ldmia sp!, {{r1, r2}}",
        "msr basepri, r1",
        "ldmia sp!, {{r4-r11}}",
        "mvn lr, #6", // EXC_RETURN 0xFFFFFFF9: thread mode, main stack
        "bx lr",
        save_sp = sym trios_save_task_sp,
        tick = sym trios_tick_entry,
    );
}

/// Record the suspended task's stack pointer. Called from the handlers
/// with the completed frame's base in `sp`.
#[no_mangle]
unsafe extern "C" fn trios_save_task_sp(sp: *mut u32) {
    let k = crate::os::kernel_ptr();
    let cur = (*k).cur;
    (*k).tasks[cur].sp = sp;
}

/// Fetch the stack pointer of the task the kernel selected.
#[no_mangle]
unsafe extern "C" fn trios_load_task_sp() -> *mut u32 {
    let k = crate::os::kernel_ptr();
    let cur = (*k).cur;
    (*k).tasks[cur].sp
}

/// Tick bookkeeping on the way into the kernel: raise the request and
/// advance the clocks. SysTick reloads itself, so there is no next
/// deadline to program.
#[no_mangle]
unsafe extern "C" fn trios_tick_entry() {
    let k = crate::os::kernel_ptr();
    (*k).request = KernelRequest::TimerExpired;
    (*k).note_tick();
}

// ---------------------------------------------------------------------------
// Initial stack frames
// ---------------------------------------------------------------------------

/// Lay down the canonical frame a brand-new task resumes from: `pc` is
/// the entry function, `lr` the termination routine (so an entry that
/// returns terminates cleanly), the mask word zero, everything else
/// zero, and xPSR carrying only the Thumb bit.
///
/// Returns the fabricated frame's base, the value to store as the
/// task's saved stack pointer.
pub fn build_initial_frame(
    stack: &mut [u8],
    entry: TaskEntry,
    terminate: TaskEntry,
) -> *mut u32 {
    let top = (stack.as_mut_ptr() as usize + stack.len()) & !7;
    let frame = (top - CONTEXT_WORDS * 4) as *mut u32;

    unsafe {
        for i in 0..CONTEXT_WORDS {
            frame.add(i).write(0);
        }
        frame.add(15).write(terminate as usize as u32); // lr
        frame.add(16).write(entry as usize as u32); // pc
        frame.add(17).write(0x0100_0000); // xPSR: Thumb
    }

    frame
}

// ---------------------------------------------------------------------------
// Small primitives
// ---------------------------------------------------------------------------

/// Sleep until an interrupt; the idle task's whole job.
#[inline]
pub fn idle_wait() {
    cortex_m::asm::wfi();
}

/// Busy-wait one blink unit (25 ms) for the abort reporter.
pub fn delay_25ms() {
    cortex_m::asm::delay(crate::config::SYSTEM_CLOCK_HZ / 40);
}
