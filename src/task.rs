//! # Task descriptors
//!
//! Defines the task model: scheduling classes, the execution state
//! machine, and the descriptor that carries everything the kernel knows
//! about one task — including its stack, which lives inline in the
//! descriptor so the whole table can be a single static array.
//!
//! Descriptors are linked into queues and lists through their own
//! `prev`/`next` fields (see [`crate::queue`]); a descriptor is a member
//! of at most one structure at a time.

use crate::config::STACK_SIZE;

// ---------------------------------------------------------------------------
// Scheduling classes
// ---------------------------------------------------------------------------

/// Scheduling class of a task, fixed at creation.
///
/// Classes form a strict priority order: a ready `System` task always
/// runs before a due `Periodic` release, which runs before any ready
/// `RoundRobin` task. `Idle` is the fallback when nothing else is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskClass {
    /// First-come, first-served; runs until it yields or terminates.
    System,
    /// Released every `period` ticks; must yield within `wcet` ticks of
    /// each release.
    Periodic,
    /// Time-sliced: preempted at every tick and sent to the back of the
    /// round-robin queue.
    RoundRobin,
    /// The built-in idle loop. Exactly one, never on a queue.
    Idle,
}

// ---------------------------------------------------------------------------
// Task state machine
// ---------------------------------------------------------------------------

/// Execution state of a task.
///
/// ```text
///   ┌──────┐  create   ┌───────┐  dispatch  ┌─────────┐
///   │ Dead │ ────────► │ Ready │ ─────────► │ Running │
///   └──────┘           └───────┘            └─────────┘
///      ▲                   ▲  preempt/yield     │  │
///      │ terminate         └────────────────────┘  │ subscribe
///      │                                           ▼
///      │                        publish       ┌─────────┐
///      └──────────────────────◄───────────────│ Waiting │
///                                             └─────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Unallocated; the descriptor sits in the dead pool.
    Dead,
    /// Runnable, parked on a structure appropriate to its class.
    Ready,
    /// Currently executing. Exactly one task is Running at a time.
    Running,
    /// Blocked on a service, parked on that service's waiter queue.
    Waiting,
}

// ---------------------------------------------------------------------------
// Entry points and creation arguments
// ---------------------------------------------------------------------------

/// A task body. Entry functions may return: the fabricated initial stack
/// frame routes a return straight into task termination.
pub type TaskEntry = extern "C" fn();

/// Arguments captured by a create system call for the kernel to act on.
#[derive(Debug, Clone, Copy)]
pub struct CreateArgs {
    pub entry: TaskEntry,
    pub class: TaskClass,
    /// 16-bit argument the task can read back with `task_get_arg`.
    pub arg: i16,
    /// Release period in ticks (periodic only).
    pub period: u16,
    /// Worst-case execution time in ticks (periodic only).
    pub wcet: u16,
    /// Ticks until the first release (periodic only).
    pub start: u16,
}

// ---------------------------------------------------------------------------
// Stack storage
// ---------------------------------------------------------------------------

/// Per-task stack memory, aligned to 8 bytes as AAPCS requires.
#[repr(align(8))]
pub struct TaskStack(pub [u8; STACK_SIZE]);

impl TaskStack {
    pub const ZEROED: TaskStack = TaskStack([0; STACK_SIZE]);
}

// ---------------------------------------------------------------------------
// Task descriptor
// ---------------------------------------------------------------------------

/// Everything the kernel tracks for one task.
///
/// Descriptors are identified by their index in the kernel's table; that
/// index (plus one) is the id handed back from task creation. The stack
/// is inline, and `sp` points into it whenever the task is suspended.
pub struct TaskDescriptor {
    /// Scheduling class, fixed from creation to termination.
    pub class: TaskClass,

    /// Current execution state.
    pub state: TaskState,

    /// Saved stack pointer. Valid only while the task is suspended;
    /// always points into `stack`.
    pub sp: *mut u32,

    /// Inline stack memory.
    pub stack: TaskStack,

    /// Argument supplied at creation, readable by the task.
    pub arg: i16,

    /// Release period in ticks. Meaningful only for periodic tasks.
    pub period: u16,

    /// Per-release tick budget. Meaningful only for periodic tasks.
    pub wcet: u16,

    /// Ticks until the next release. Decremented on every tick; a value
    /// at or below zero means the release is due. Signed because the
    /// release may be claimed one or more ticks late.
    pub countdown: i16,

    /// Intrusive links for whichever queue or list currently holds this
    /// descriptor. `None` when unlinked.
    pub prev: Option<usize>,
    pub next: Option<usize>,

    /// Where a published value is deposited while this task waits on a
    /// service. Null except between subscribe and wake-up.
    pub value: *mut i16,
}

// Safety: the raw pointers are either null, into the descriptor's own
// stack, or into the stack of a task blocked on a service; all access
// happens inside the kernel with the tick masked.
unsafe impl Send for TaskDescriptor {}
unsafe impl Sync for TaskDescriptor {}

impl TaskDescriptor {
    /// An unallocated descriptor, used to build the static table.
    pub const EMPTY: TaskDescriptor = TaskDescriptor {
        class: TaskClass::Idle,
        state: TaskState::Dead,
        sp: core::ptr::null_mut(),
        stack: TaskStack::ZEROED,
        arg: 0,
        period: 0,
        wcet: 0,
        countdown: 0,
        prev: None,
        next: None,
        value: core::ptr::null_mut(),
    };

    /// Fill in the descriptor for a freshly created task. The stack
    /// frame is fabricated separately by the architecture port.
    pub fn init(&mut self, args: &CreateArgs) {
        self.class = args.class;
        self.state = TaskState::Ready;
        self.arg = args.arg;
        self.period = args.period;
        self.wcet = args.wcet;
        self.countdown = args.start as i16;
        self.value = core::ptr::null_mut();
    }

    #[inline]
    pub fn is_linked(&self) -> bool {
        self.prev.is_some() || self.next.is_some()
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------
