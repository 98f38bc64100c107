//! # System-call surface
//!
//! The public face of the kernel: everything a task may ask of it, plus
//! boot. One static [`Kernel`] instance lives here, reached through a
//! raw pointer so the exception handlers in the port can get at it.
//!
//! ## Startup sequence
//!
//! ```text
//! reset (cortex-m-rt)
//!   └─► main()
//!         └─► os::start(board, app_main)      ← never returns
//!               ├─► raise the kernel mask
//!               ├─► bootstrap: dead pool, idle task, app_main task
//!               ├─► program SVCall/SysTick priorities and the tick
//!               └─► loop { dispatch; exit_kernel; handle_request }
//! ```
//!
//! ## Stub protocol
//!
//! Every system call follows the same shape, with the tick masked from
//! before the request is written until after any result is read back:
//! write the request, cross into the kernel, resume here later. Any
//! error the kernel reports is terminal: [`fatal`] never returns.

use crate::arch;
use crate::error::ErrorCode;
use crate::kernel::{Kernel, KernelRequest};
use crate::service::ServiceHandle;
use crate::sync;
use crate::task::{CreateArgs, TaskClass, TaskEntry};

// ---------------------------------------------------------------------------
// Global kernel instance
// ---------------------------------------------------------------------------

/// The one kernel. All access goes through `KERNEL_PTR`.
static mut KERNEL: Kernel = Kernel::new();

/// Raw pointer to the kernel, set once during `start`. The exception
/// handlers cannot take references, and stubs keep their borrows
/// instruction-short for the same reason: the handler may run between
/// any two of them.
static mut KERNEL_PTR: *mut Kernel = core::ptr::null_mut();

#[inline]
pub(crate) fn kernel_ptr() -> *mut Kernel {
    unsafe { KERNEL_PTR }
}

// ---------------------------------------------------------------------------
// Board hooks
// ---------------------------------------------------------------------------

/// What the board lends the kernel: the LED bank the abort reporter
/// blinks error codes on.
#[derive(Clone, Copy)]
pub struct Board {
    pub leds_on: fn(),
    pub leds_off: fn(),
}

fn led_nop() {}

static mut BOARD: Board = Board {
    leds_on: led_nop,
    leds_off: led_nop,
};

// ---------------------------------------------------------------------------
// Boot
// ---------------------------------------------------------------------------

/// Bring the system up and run it forever. `main_task` becomes the
/// first system task; create everything else from inside it.
pub fn start(board: Board, main_task: TaskEntry) -> ! {
    unsafe {
        BOARD = board;
        KERNEL_PTR = core::ptr::addr_of_mut!(KERNEL);
    }

    // The kernel runs masked from here until its first exit to a task.
    sync::raise_kernel_mask();

    if let Err(e) = unsafe { (*kernel_ptr()).bootstrap(main_task) } {
        fatal(e);
    }

    arch::interrupt_init();
    arch::timer_init();

    loop {
        if let Err(e) = unsafe { (*kernel_ptr()).dispatch() } {
            fatal(e);
        }

        arch::exit_kernel();

        // a system call or the tick has brought us back

        if let Err(e) = unsafe { (*kernel_ptr()).handle_request() } {
            fatal(e);
        }
    }
}

/// The idle task: wait for the next interrupt, forever.
pub(crate) extern "C" fn idle_main() {
    loop {
        arch::idle_wait();
    }
}

/// Where a task entry function lands if it returns; fabricated into
/// every initial stack frame as the return address.
pub(crate) extern "C" fn task_return() {
    task_terminate();
}

// ---------------------------------------------------------------------------
// Task system calls
// ---------------------------------------------------------------------------

fn create(args: CreateArgs) -> u8 {
    sync::with_kernel_masked(|| unsafe {
        (*kernel_ptr()).request = KernelRequest::TaskCreate(args);
        arch::enter_kernel();
        (*kernel_ptr()).create_result
    })
}

/// Create a first-come-first-served system task. May preempt the
/// caller if the caller is of a lower class. Returns the task id.
pub fn task_create_system(entry: TaskEntry, arg: i16) -> u8 {
    create(CreateArgs {
        entry,
        class: TaskClass::System,
        arg,
        period: 0,
        wcet: 0,
        start: 0,
    })
}

/// Create a round-robin task.
pub fn task_create_rr(entry: TaskEntry, arg: i16) -> u8 {
    create(CreateArgs {
        entry,
        class: TaskClass::RoundRobin,
        arg,
        period: 0,
        wcet: 0,
        start: 0,
    })
}

/// Create a periodic task: first release in `start` ticks, one release
/// every `period` ticks, each release allowed `wcet` ticks of work.
/// A budget longer than the period is refused fatally.
pub fn task_create_periodic(
    entry: TaskEntry,
    arg: i16,
    period: u16,
    wcet: u16,
    start: u16,
) -> u8 {
    create(CreateArgs {
        entry,
        class: TaskClass::Periodic,
        arg,
        period,
        wcet,
        start,
    })
}

/// Give up the processor voluntarily. For a periodic task this closes
/// the current release.
pub fn task_next() {
    sync::with_kernel_masked(|| unsafe {
        (*kernel_ptr()).request = KernelRequest::TaskNext;
        arch::enter_kernel();
    })
}

/// End the calling task and recycle its descriptor.
pub fn task_terminate() -> ! {
    sync::with_kernel_masked(|| unsafe {
        (*kernel_ptr()).request = KernelRequest::TaskTerminate;
        arch::enter_kernel();
    });
    // the kernel never dispatches this task again
    loop {
        arch::idle_wait();
    }
}

/// Read back the argument this task was created with.
pub fn task_get_arg() -> i16 {
    sync::with_kernel_masked(|| unsafe { (*kernel_ptr()).current().arg })
}

// ---------------------------------------------------------------------------
// Service system calls
// ---------------------------------------------------------------------------

/// Allocate a service. Slots are finite and never recycled; running
/// out is fatal.
pub fn service_init() -> ServiceHandle {
    sync::with_kernel_masked(|| {
        match unsafe { (*kernel_ptr()).service_init() } {
            Ok(handle) => handle,
            Err(e) => fatal(e),
        }
    })
}

/// Block until the next value published on `service` arrives in
/// `value`. Periodic tasks may not block; trying is fatal.
pub fn service_subscribe(service: ServiceHandle, value: &mut i16) {
    sync::with_kernel_masked(|| unsafe {
        if let Err(e) = (*kernel_ptr()).service_subscribe(service, value) {
            fatal(e);
        }
        (*kernel_ptr()).request = KernelRequest::TaskNext;
        arch::enter_kernel();
    })
}

/// Wake every subscriber of `service` with `value`. If a system-class
/// waiter woke above a lower-class caller, the caller is preempted
/// before this returns.
pub fn service_publish(service: ServiceHandle, value: i16) {
    sync::with_kernel_masked(|| unsafe {
        match (*kernel_ptr()).service_publish(service, value) {
            Ok(true) => {
                (*kernel_ptr()).request = KernelRequest::TaskInterrupt;
                arch::enter_kernel();
            }
            Ok(false) => {}
            Err(e) => fatal(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Time and abort
// ---------------------------------------------------------------------------

/// Milliseconds since boot, tick count refined by the timer's cycle
/// counter.
pub fn now() -> u16 {
    sync::with_kernel_masked(|| unsafe {
        (*kernel_ptr()).now_ms(arch::read_subtick())
    })
}

/// Deliberate application-level shutdown.
pub fn abort() -> ! {
    fatal(ErrorCode::UserAbort)
}

/// Terminal error reporting. On hardware: interrupts off, blink the
/// code forever. On the host: panic, so a failing test says why.
pub(crate) fn fatal(err: ErrorCode) -> ! {
    unsafe {
        let k = kernel_ptr();
        if !k.is_null() {
            (*k).last_error = err;
        }
    }

    #[cfg(all(target_arch = "arm", target_os = "none"))]
    {
        cortex_m::interrupt::disable();
        let board = unsafe { *core::ptr::addr_of!(BOARD) };
        crate::abort::blink_forever(err, board)
    }

    #[cfg(not(all(target_arch = "arm", target_os = "none")))]
    {
        panic!("fatal rtos error: {:?}", err)
    }
}
