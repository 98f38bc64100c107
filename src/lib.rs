//! # trios — a tri-class real-time kernel
//!
//! A small preemptive RTOS for single-core ARM Cortex-M4
//! microcontrollers, with no heap and no allocation after boot. Tasks
//! come in three scheduling classes plus a built-in idle task:
//!
//! - **System** — first-come first-served, highest priority, run until
//!   they yield or terminate.
//! - **Periodic** — released on a fixed period, each release granted a
//!   worst-case execution budget in ticks; overrunning the budget or
//!   colliding with another release takes the whole system down.
//! - **Round-robin** — lowest class, preempted on every tick and
//!   rotated through a ready queue.
//!
//! Tasks talk through **services**: publish/subscribe rendezvous points
//! that carry one 16-bit value per publication, wake every waiter at
//! once, and bump woken system-class tasks ahead of the publisher.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Application tasks                       │
//! ├───────────────────────────────────────────────────────────┤
//! │              System-call surface (os.rs)                   │
//! │  start · task_create_* · task_next · task_terminate        │
//! │  service_init/subscribe/publish · now · abort              │
//! ├──────────────────┬───────────────────┬────────────────────┤
//! │  Kernel          │  Services         │  Abort reporter     │
//! │  kernel.rs       │  service.rs       │  abort.rs           │
//! │  ─ dispatch()    │  ─ subscribe()    │  ─ blink codes      │
//! │  ─ handle_req()  │  ─ publish()      │                     │
//! ├──────────────────┴───────────────────┴────────────────────┤
//! │        Task model (task.rs) · queues (queue.rs)            │
//! │   descriptor table · intrusive FIFO/list · dead pool       │
//! ├───────────────────────────────────────────────────────────┤
//! │              Port (arch/cortex_m4.rs)                      │
//! │   SVCall · SysTick · canonical frames · MSP/PSP split      │
//! ├───────────────────────────────────────────────────────────┤
//! │                ARM Cortex-M4 (Thumb-2)                     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Execution model
//!
//! The kernel is its own thread of control on the main stack, running
//! with the tick masked. Its whole life is the loop
//! `dispatch → exit to task → handle request`: every system call and
//! every tick interrupt suspends the running task mid-flight and lands
//! back in that loop. The two halves of the scheduler therefore never
//! race anything — all kernel state is mutated between context
//! switches, with interrupts held off.
//!
//! ## Memory model
//!
//! - No heap, no `alloc`; every structure is statically sized.
//! - One descriptor table, `MAX_TASKS` application slots plus idle,
//!   each with its stack inline.
//! - Queues and lists are intrusive: membership rides on the
//!   descriptors' own link fields.
//! - Errors are never recovered: each failure blinks its code on the
//!   board LEDs until power-off.
//!
//! The kernel core is architecture-free and tests on the host; only
//! `arch/cortex_m4.rs` touches the hardware.

#![cfg_attr(not(test), no_std)]

pub mod abort;
pub mod arch;
pub mod config;
pub mod error;
pub mod kernel;
pub mod os;
pub mod queue;
pub mod service;
pub mod sync;
pub mod task;
