//! # Kernel
//!
//! The scheduling core. One [`Kernel`] value owns the task table, every
//! queue and list, the service slots, and the bookkeeping for periodic
//! release budgets. It has no architecture dependencies beyond initial
//! stack fabrication, so the whole policy is exercisable on the host.
//!
//! ## Scheduling algorithm
//!
//! The kernel alternates two halves around a context switch, forever:
//!
//! ```text
//! loop {
//!     dispatch();        // pick the next task, mark it Running
//!     exit_kernel();     // run it until a tick or a system call
//!     handle_request();  // act on whatever brought us back
//! }
//! ```
//!
//! Dispatch keeps a still-Running current task; otherwise it takes, in
//! strict priority order: the head of the system queue, the unique due
//! periodic release, the head of the round-robin queue, or idle.
//!
//! Request handling consumes the pending [`KernelRequest`] written by a
//! system-call stub or the tick interrupt. Any error bubbles out to the
//! caller in `os`, which never returns from reporting it.

use crate::config::{
    IDLE_INDEX, MAX_SERVICES, MAX_TASKS, MS_CYCLES, MS_CYCLES2, MS_CYCLES3, MS_CYCLES4, TICK_MS,
    TOTAL_TASKS,
};
use crate::error::ErrorCode;
use crate::queue::{TaskList, TaskQueue};
use crate::service::Service;
use crate::task::{CreateArgs, TaskClass, TaskDescriptor, TaskEntry, TaskState};

// ---------------------------------------------------------------------------
// Kernel requests
// ---------------------------------------------------------------------------

/// What the suspended task (or the tick interrupt) wants from the
/// kernel. Written by exactly one party before entering the kernel and
/// consumed once per loop iteration.
#[derive(Debug, Clone, Copy)]
pub enum KernelRequest {
    /// Nothing pending. Finding this while handling is an internal error.
    None,
    /// The tick interrupt fired while a task was running.
    TimerExpired,
    /// Create a task from the captured arguments.
    TaskCreate(CreateArgs),
    /// The current task is done; reclaim its descriptor.
    TaskTerminate,
    /// A publish woke a higher-priority waiter; preempt the publisher.
    TaskInterrupt,
    /// Voluntary yield.
    TaskNext,
}

// ---------------------------------------------------------------------------
// Kernel state
// ---------------------------------------------------------------------------

/// The complete scheduler state. Stored as a single static in `os` and
/// reached through a raw pointer from the interrupt handlers.
pub struct Kernel {
    /// All task descriptors; the last slot is the idle task.
    pub tasks: [TaskDescriptor; TOTAL_TASKS],

    /// Index of the current task. Outside `dispatch` this is the one
    /// Running task (or idle).
    pub cur: usize,

    /// Request pending from the last kernel entry.
    pub request: KernelRequest,

    /// Id produced by the most recent create request, for its stub to
    /// pick up after the creator is resumed.
    pub create_result: u8,

    /// Descriptors available for allocation.
    pub dead_pool: TaskQueue,

    /// Ready system tasks, first-come first-served.
    pub system_queue: TaskQueue,

    /// Ready round-robin tasks.
    pub rr_queue: TaskQueue,

    /// Every live periodic task, Ready or Running. Membership lasts from
    /// creation to termination; `countdown` says when each is due.
    pub periodic_list: TaskList,

    /// Rendezvous slots, bump-allocated by `service_init`.
    pub services: [Service; MAX_SERVICES],
    pub service_count: usize,

    /// Ticks seen since boot.
    pub tick_count: u32,

    /// Milliseconds implied by `tick_count`; wraps at u16 range.
    pub elapsed_ms: u16,

    /// Ticks left in the periodic release currently in flight. Zero
    /// whenever no release is in flight.
    pub ticks_remaining: u16,

    /// The error that took the system down, once one has.
    pub last_error: ErrorCode,
}

impl Kernel {
    pub const fn new() -> Self {
        Self {
            tasks: [TaskDescriptor::EMPTY; TOTAL_TASKS],
            cur: IDLE_INDEX,
            request: KernelRequest::None,
            create_result: 0,
            dead_pool: TaskQueue::EMPTY,
            system_queue: TaskQueue::EMPTY,
            rr_queue: TaskQueue::EMPTY,
            periodic_list: TaskList::EMPTY,
            services: [Service::EMPTY; MAX_SERVICES],
            service_count: 0,
            tick_count: 0,
            elapsed_ms: 0,
            ticks_remaining: 0,
            last_error: ErrorCode::UserAbort,
        }
    }

    /// Build the dead pool, install the idle task in its reserved slot,
    /// and create the application's main task as the first system task,
    /// selected to run first.
    pub fn bootstrap(&mut self, main_entry: TaskEntry) -> Result<(), ErrorCode> {
        for i in 0..MAX_TASKS {
            self.tasks[i].state = TaskState::Dead;
            self.dead_pool.enqueue(&mut self.tasks, i);
        }

        self.create_task(CreateArgs {
            entry: crate::os::idle_main,
            class: TaskClass::Idle,
            arg: 0,
            period: 0,
            wcet: 0,
            start: 0,
        })?;

        let main_id = self.create_task(CreateArgs {
            entry: main_entry,
            class: TaskClass::System,
            arg: 0,
            period: 0,
            wcet: 0,
            start: 0,
        })?;

        self.cur = main_id as usize - 1;
        self.tasks[self.cur].state = TaskState::Running;
        let _ = self.system_queue.dequeue(&mut self.tasks);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Choose the next task to run and mark it Running. A current task
    /// that is still Running (and is not idle) keeps the processor.
    pub fn dispatch(&mut self) -> Result<(), ErrorCode> {
        if self.tasks[self.cur].state != TaskState::Running || self.cur == IDLE_INDEX {
            if let Some(idx) = self.system_queue.dequeue(&mut self.tasks) {
                self.cur = idx;
            } else if let Some(idx) = self.find_due_periodic()? {
                self.cur = idx;
                let period = self.tasks[idx].period as i16;
                self.tasks[idx].countdown += period;
                if self.ticks_remaining == 0 {
                    self.ticks_remaining = self.tasks[idx].wcet;
                }
            } else if let Some(idx) = self.rr_queue.dequeue(&mut self.tasks) {
                self.cur = idx;
            } else {
                self.cur = IDLE_INDEX;
            }

            self.tasks[self.cur].state = TaskState::Running;
        }
        Ok(())
    }

    /// Scan the periodic list for the task due this tick. Two due at
    /// once is a schedulability failure.
    fn find_due_periodic(&self) -> Result<Option<usize>, ErrorCode> {
        let mut due = None;
        let mut cursor = self.periodic_list.head;
        while let Some(i) = cursor {
            if self.tasks[i].countdown <= 0 {
                if due.is_some() {
                    return Err(ErrorCode::PeriodicCollision);
                }
                due = Some(i);
            }
            cursor = self.tasks[i].next;
        }
        Ok(due)
    }

    // -----------------------------------------------------------------------
    // Request handling
    // -----------------------------------------------------------------------

    /// Act on the pending request. Called once per kernel entry, after
    /// the suspended task's context has been put away.
    pub fn handle_request(&mut self) -> Result<(), ErrorCode> {
        match core::mem::replace(&mut self.request, KernelRequest::None) {
            KernelRequest::None => Err(ErrorCode::RtosInternal),

            KernelRequest::TimerExpired => {
                self.update_ticker()?;

                // Round-robin tasks surrender the processor every tick.
                let cur = self.cur;
                if self.tasks[cur].class == TaskClass::RoundRobin
                    && self.tasks[cur].state == TaskState::Running
                {
                    self.tasks[cur].state = TaskState::Ready;
                    self.rr_queue.enqueue(&mut self.tasks, cur);
                }
                Ok(())
            }

            KernelRequest::TaskCreate(args) => {
                self.create_result = self.create_task(args)?;
                let cur = self.cur;

                // A new system task outranks any non-system current.
                if args.class == TaskClass::System
                    && self.tasks[cur].class != TaskClass::System
                {
                    self.tasks[cur].state = TaskState::Ready;
                    if self.tasks[cur].class == TaskClass::Periodic {
                        self.rewind_slot(cur);
                    }
                }

                // An immediately-due periodic outranks a round-robin current.
                if self.tasks[cur].class == TaskClass::RoundRobin
                    && args.class == TaskClass::Periodic
                    && args.start == 0
                {
                    self.tasks[cur].state = TaskState::Ready;
                }

                if self.tasks[cur].class == TaskClass::RoundRobin
                    && self.tasks[cur].state == TaskState::Ready
                {
                    self.rr_queue.enqueue(&mut self.tasks, cur);
                }
                Ok(())
            }

            KernelRequest::TaskTerminate => {
                if self.cur != IDLE_INDEX {
                    self.terminate_current();
                }
                Ok(())
            }

            KernelRequest::TaskInterrupt => {
                let cur = self.cur;
                if self.tasks[cur].state == TaskState::Running {
                    match self.tasks[cur].class {
                        TaskClass::System => {}
                        TaskClass::Periodic => {
                            self.tasks[cur].state = TaskState::Ready;
                            self.rewind_slot(cur);
                        }
                        TaskClass::RoundRobin => {
                            self.tasks[cur].state = TaskState::Ready;
                            // Front of the queue: the publisher keeps its
                            // position, it only loses the processor.
                            self.rr_queue.push(&mut self.tasks, cur);
                        }
                        TaskClass::Idle => {}
                    }
                }
                Ok(())
            }

            KernelRequest::TaskNext => {
                let cur = self.cur;
                // A subscriber arrives here already Waiting; it must not
                // be re-queued as ready.
                if self.tasks[cur].state == TaskState::Running {
                    match self.tasks[cur].class {
                        TaskClass::System => {
                            self.system_queue.enqueue(&mut self.tasks, cur)
                        }
                        TaskClass::Periodic => self.ticks_remaining = 0,
                        TaskClass::RoundRobin => {
                            self.rr_queue.enqueue(&mut self.tasks, cur)
                        }
                        TaskClass::Idle => {}
                    }
                    self.tasks[cur].state = TaskState::Ready;
                }
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Periodic accounting
    // -----------------------------------------------------------------------

    /// Per-tick bookkeeping: charge the release budget and advance every
    /// periodic countdown.
    fn update_ticker(&mut self) -> Result<(), ErrorCode> {
        if !self.periodic_list.is_empty() {
            // System tasks run on borrowed time and do not charge the
            // periodic budget.
            if self.tasks[self.cur].class != TaskClass::System && self.ticks_remaining > 0 {
                self.ticks_remaining -= 1;
            }

            if self.ticks_remaining == 0 && self.tasks[self.cur].class == TaskClass::Periodic {
                return Err(ErrorCode::PeriodicOverran);
            }

            let mut cursor = self.periodic_list.head;
            while let Some(i) = cursor {
                self.tasks[i].countdown -= 1;
                if self.tasks[i].countdown == 0
                    && self.tasks[self.cur].class == TaskClass::Periodic
                    && i != self.cur
                {
                    return Err(ErrorCode::PeriodicCollision);
                }
                cursor = self.tasks[i].next;
            }
        }
        Ok(())
    }

    /// Undo in-flight slot accounting for a periodic task that lost the
    /// processor mid-release: put its release back in front of it and
    /// refund the tick the preemptor will consume.
    // TODO: credit the full length of the preemption, not a single tick.
    fn rewind_slot(&mut self, idx: usize) {
        let period = self.tasks[idx].period as i16;
        self.tasks[idx].countdown -= period;
        self.ticks_remaining += 1;
    }

    // -----------------------------------------------------------------------
    // Task lifecycle
    // -----------------------------------------------------------------------

    /// Allocate a descriptor, fabricate its initial stack frame, and
    /// place it where its class is scheduled from. Returns the task id
    /// (table index + 1).
    pub fn create_task(&mut self, args: CreateArgs) -> Result<u8, ErrorCode> {
        if args.class != TaskClass::Idle && self.dead_pool.is_empty() {
            return Err(ErrorCode::TooManyTasks);
        }

        if args.class == TaskClass::Periodic && args.period < args.wcet {
            return Err(ErrorCode::WcetGreaterThanPeriod);
        }

        let idx = if args.class == TaskClass::Idle {
            // The idle task lives in the reserved last slot.
            IDLE_INDEX
        } else {
            self.dead_pool
                .dequeue(&mut self.tasks)
                .ok_or(ErrorCode::RtosInternal)?
        };

        let t = &mut self.tasks[idx];
        t.init(&args);
        t.sp = crate::arch::build_initial_frame(
            &mut t.stack.0,
            args.entry,
            crate::os::task_return,
        );

        match args.class {
            TaskClass::System => self.system_queue.enqueue(&mut self.tasks, idx),
            TaskClass::Periodic => self.periodic_list.add(&mut self.tasks, idx),
            TaskClass::RoundRobin => self.rr_queue.enqueue(&mut self.tasks, idx),
            TaskClass::Idle => {}
        }

        Ok(idx as u8 + 1)
    }

    /// Reclaim the current task's descriptor.
    fn terminate_current(&mut self) {
        let cur = self.cur;
        self.tasks[cur].state = TaskState::Dead;
        if self.tasks[cur].class == TaskClass::Periodic {
            self.periodic_list.remove(&mut self.tasks, cur);
        }
        self.dead_pool.enqueue(&mut self.tasks, cur);
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// Record one tick interrupt.
    pub fn note_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
        self.elapsed_ms = self.elapsed_ms.wrapping_add(TICK_MS);
    }

    /// Milliseconds since boot, refined below tick granularity by the
    /// timer cycle count since the last tick. The five-way threshold
    /// comparison (and the wrap during the first tick of uptime) is
    /// deliberate: it reproduces the established behavior of this
    /// interface exactly.
    pub fn now_ms(&self, cycles_into_tick: u16) -> u16 {
        let base = self.elapsed_ms.wrapping_sub(TICK_MS);
        if cycles_into_tick < MS_CYCLES {
            return base;
        }
        if cycles_into_tick < MS_CYCLES2 {
            return base.wrapping_add(1);
        }
        if cycles_into_tick < MS_CYCLES3 {
            return base.wrapping_add(2);
        }
        if cycles_into_tick < MS_CYCLES4 {
            return base.wrapping_add(3);
        }
        base.wrapping_add(4)
    }

    #[inline]
    pub fn current(&self) -> &TaskDescriptor {
        &self.tasks[self.cur]
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn noop() {}

    fn booted() -> Kernel {
        let mut k = Kernel::new();
        k.bootstrap(noop).unwrap();
        k
    }

    fn rr(arg: i16) -> CreateArgs {
        CreateArgs {
            entry: noop,
            class: TaskClass::RoundRobin,
            arg,
            period: 0,
            wcet: 0,
            start: 0,
        }
    }

    fn system(arg: i16) -> CreateArgs {
        CreateArgs {
            entry: noop,
            class: TaskClass::System,
            arg,
            period: 0,
            wcet: 0,
            start: 0,
        }
    }

    fn periodic(period: u16, wcet: u16, start: u16) -> CreateArgs {
        CreateArgs {
            entry: noop,
            class: TaskClass::Periodic,
            arg: 0,
            period,
            wcet,
            start,
        }
    }

    /// Drive one full loop turn for a given request.
    fn turn(k: &mut Kernel, req: KernelRequest) -> Result<(), ErrorCode> {
        k.request = req;
        k.handle_request()?;
        k.dispatch()
    }

    fn tick(k: &mut Kernel) -> Result<(), ErrorCode> {
        k.note_tick();
        turn(k, KernelRequest::TimerExpired)
    }

    #[test]
    fn bootstrap_selects_main_and_fills_pool() {
        let k = booted();
        assert_eq!(k.cur, 0);
        assert_eq!(k.tasks[0].class, TaskClass::System);
        assert_eq!(k.tasks[0].state, TaskState::Running);
        assert!(k.system_queue.is_empty());
        // main consumed one of the application slots
        assert_eq!(k.dead_pool.len(&k.tasks), MAX_TASKS - 1);
        assert_eq!(k.tasks[IDLE_INDEX].class, TaskClass::Idle);
        assert!(!k.tasks[IDLE_INDEX].is_linked());
    }

    #[test]
    fn create_returns_ids_from_table_indices() {
        let mut k = booted();
        // main took slot 0 (id 1); the next allocation takes slot 1
        assert_eq!(k.create_task(rr(0)).unwrap(), 2);
        assert_eq!(k.create_task(rr(0)).unwrap(), 3);
    }

    #[test]
    fn create_terminate_round_trips_the_free_list() {
        let mut k = booted();
        let before = k.dead_pool.len(&k.tasks);

        turn(&mut k, KernelRequest::TaskCreate(rr(0))).unwrap();
        assert_eq!(k.dead_pool.len(&k.tasks), before - 1);

        // main terminates; the worker runs; the worker terminates
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.tasks[k.cur].class, TaskClass::RoundRobin);
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        assert_eq!(k.dead_pool.len(&k.tasks), before + 1);
        assert_eq!(k.cur, IDLE_INDEX);
    }

    #[test]
    fn round_robin_alternates_on_ticks() {
        let mut k = booted();
        let a = turn_create(&mut k, rr(0));
        let b = turn_create(&mut k, rr(1));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        let mut order = [0usize; 6];
        for slot in order.iter_mut() {
            *slot = k.cur;
            tick(&mut k).unwrap();
        }
        assert_eq!(order, [a, b, a, b, a, b]);
    }

    fn turn_create(k: &mut Kernel, args: CreateArgs) -> usize {
        turn(k, KernelRequest::TaskCreate(args)).unwrap();
        k.create_result as usize - 1
    }

    #[test]
    fn new_system_task_preempts_round_robin() {
        let mut k = booted();
        let a = turn_create(&mut k, rr(0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, a);

        // the running round-robin task creates a system task
        let s = turn_create(&mut k, system(0));
        assert_eq!(k.cur, s);
        assert_eq!(k.tasks[a].state, TaskState::Ready);

        // when the system task goes away, the worker resumes
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, a);
    }

    #[test]
    fn system_yield_is_idempotent() {
        let mut k = booted();
        // main is the sole system task; yielding hands control straight back
        turn(&mut k, KernelRequest::TaskNext).unwrap();
        assert_eq!(k.cur, 0);
        assert_eq!(k.tasks[0].state, TaskState::Running);
    }

    #[test]
    fn sole_task_terminating_leaves_idle() {
        let mut k = booted();
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, IDLE_INDEX);
        assert_eq!(k.tasks[IDLE_INDEX].state, TaskState::Running);
    }

    #[test]
    fn periodic_release_loads_budget_and_repeats() {
        let mut k = booted();
        let p = turn_create(&mut k, periodic(10, 2, 0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        // due immediately: countdown rolls forward, budget armed
        assert_eq!(k.cur, p);
        assert_eq!(k.tasks[p].countdown, 10);
        assert_eq!(k.ticks_remaining, 2);

        // one tick of work, then a yield inside the budget
        tick(&mut k).unwrap();
        assert_eq!(k.cur, p);
        turn(&mut k, KernelRequest::TaskNext).unwrap();
        assert_eq!(k.ticks_remaining, 0);
        assert_eq!(k.cur, IDLE_INDEX);

        // nine more ticks bring the next release
        for _ in 0..9 {
            tick(&mut k).unwrap();
        }
        assert_eq!(k.cur, p);
        assert_eq!(k.ticks_remaining, 2);
    }

    #[test]
    fn periodic_overrun_is_fatal() {
        let mut k = booted();
        turn_create(&mut k, periodic(10, 2, 0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        // spins without yielding: the second tick exhausts wcet = 2
        tick(&mut k).unwrap();
        assert_eq!(tick(&mut k), Err(ErrorCode::PeriodicOverran));
    }

    #[test]
    fn simultaneous_releases_collide() {
        let mut k = booted();
        turn_create(&mut k, periodic(10, 1, 5));
        turn_create(&mut k, periodic(10, 1, 5));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        for _ in 0..4 {
            tick(&mut k).unwrap();
        }
        // the fifth tick makes both due; dispatch detects the collision
        assert_eq!(tick(&mut k), Err(ErrorCode::PeriodicCollision));
    }

    #[test]
    fn collision_detected_under_running_periodic() {
        let mut k = booted();
        // P1 runs a long release; P2 becomes due two ticks in
        turn_create(&mut k, periodic(10, 5, 0));
        turn_create(&mut k, periodic(10, 1, 2));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        tick(&mut k).unwrap();
        assert_eq!(tick(&mut k), Err(ErrorCode::PeriodicCollision));
    }

    #[test]
    fn create_from_periodic_within_budget_is_safe() {
        let mut k = booted();
        let p = turn_create(&mut k, periodic(10, 2, 0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, p);

        // the release creates a worker and yields within its budget
        let w = turn_create(&mut k, rr(0));
        assert_eq!(k.cur, p);
        tick(&mut k).unwrap();
        turn(&mut k, KernelRequest::TaskNext).unwrap();
        assert_eq!(k.cur, w);

        // the remainder of the period passes without any overrun
        for _ in 0..9 {
            tick(&mut k).unwrap();
        }
        assert_eq!(k.cur, p);
    }

    #[test]
    fn system_create_rewinds_interrupted_release() {
        let mut k = booted();
        let p = turn_create(&mut k, periodic(10, 3, 0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, p);
        let budget = k.ticks_remaining;
        let countdown = k.tasks[p].countdown;

        // mid-release, the periodic task creates a system task
        let s = turn_create(&mut k, system(0));
        assert_eq!(k.cur, s);
        assert_eq!(k.tasks[p].state, TaskState::Ready);
        assert_eq!(k.tasks[p].countdown, countdown - 10);
        assert_eq!(k.ticks_remaining, budget + 1);
    }

    #[test]
    fn immediate_periodic_preempts_round_robin_creator() {
        let mut k = booted();
        let a = turn_create(&mut k, rr(0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, a);

        let p = turn_create(&mut k, periodic(10, 1, 0));
        assert_eq!(k.cur, p);
        // the worker kept its place at the head of nothing worse than
        // the ready queue
        assert_eq!(k.tasks[a].state, TaskState::Ready);
    }

    #[test]
    fn deferred_periodic_does_not_preempt_creator() {
        let mut k = booted();
        let a = turn_create(&mut k, rr(0));
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();

        turn_create(&mut k, periodic(10, 1, 3));
        assert_eq!(k.cur, a);
    }

    #[test]
    fn wcet_longer_than_period_is_rejected() {
        let mut k = booted();
        assert_eq!(
            k.create_task(periodic(5, 6, 0)),
            Err(ErrorCode::WcetGreaterThanPeriod)
        );
    }

    #[test]
    fn exhausting_the_pool_is_fatal() {
        let mut k = booted();
        for _ in 0..(MAX_TASKS - 1) {
            k.create_task(rr(0)).unwrap();
        }
        assert_eq!(k.create_task(rr(0)), Err(ErrorCode::TooManyTasks));
    }

    #[test]
    fn empty_request_is_an_internal_error() {
        let mut k = booted();
        assert_eq!(
            turn(&mut k, KernelRequest::None),
            Err(ErrorCode::RtosInternal)
        );
    }

    #[test]
    fn dispatch_prefers_system_over_periodic_over_rr() {
        let mut k = booted();
        let s = turn_create(&mut k, system(0));
        let _p = turn_create(&mut k, periodic(10, 1, 0));
        let a = turn_create(&mut k, rr(0));

        // main still runs (system class is not preempted by system)
        assert_eq!(k.cur, 0);
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        assert_eq!(k.cur, s);
        turn(&mut k, KernelRequest::TaskTerminate).unwrap();
        // the due periodic outranks the ready round-robin task
        assert_ne!(k.cur, a);
        assert_eq!(k.tasks[k.cur].class, TaskClass::Periodic);
    }

    #[test]
    fn ready_tasks_sit_on_exactly_one_structure() {
        let mut k = booted();
        let a = turn_create(&mut k, rr(0));
        let p = turn_create(&mut k, periodic(10, 1, 4));
        assert_eq!(k.rr_queue.len(&k.tasks), 1);
        assert!(k.tasks[a].state == TaskState::Ready);
        assert_eq!(k.periodic_list.head, Some(p));
        assert_eq!(k.tasks[p].next, None);
        assert_eq!(k.tasks[p].prev, None);
    }

    #[test]
    fn now_applies_subtick_thresholds() {
        let mut k = booted();
        k.note_tick(); // elapsed_ms = 5
        assert_eq!(k.now_ms(0), 0);
        assert_eq!(k.now_ms(MS_CYCLES - 1), 0);
        assert_eq!(k.now_ms(MS_CYCLES), 1);
        assert_eq!(k.now_ms(MS_CYCLES2), 2);
        assert_eq!(k.now_ms(MS_CYCLES3), 3);
        assert_eq!(k.now_ms(MS_CYCLES4), 4);
        assert_eq!(k.now_ms(u16::MAX), 4);
    }

    #[test]
    fn now_wraps_before_the_first_tick() {
        let k = booted();
        // established quirk: during the first 5 ms of uptime the
        // millisecond clock reads from the wrapped end of the range
        assert_eq!(k.now_ms(0), u16::MAX - 4);
    }
}
