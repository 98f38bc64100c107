//! # Services — publish/subscribe rendezvous
//!
//! A service is a named meeting point carrying one 16-bit value per
//! publication. Subscribers park on the service's waiter queue until a
//! publisher arrives; the publisher deposits the value directly into
//! each waiter's out-slot and makes them all ready at once.
//!
//! Waiters restart at the *head* of their class queue rather than the
//! tail, so a woken task runs with the least possible latency. If a
//! system-class waiter wakes and the publisher is of a lower class, the
//! publisher is preempted the moment the publish completes.
//!
//! Periodic tasks may not block: a release that parked on a queue could
//! never be guaranteed to meet its budget, so subscribing from one is
//! fatal, and discovering one on a waiter queue later is equally fatal.
//!
//! All service state is mutated inside system calls with the tick
//! masked, which serialises publishers and subscribers by construction.

use crate::error::ErrorCode;
use crate::kernel::Kernel;
use crate::queue::TaskQueue;
use crate::task::{TaskClass, TaskState};

// ---------------------------------------------------------------------------
// Service slot
// ---------------------------------------------------------------------------

/// One rendezvous point: a queue of waiting subscribers.
pub struct Service {
    pub waiters: TaskQueue,
}

impl Service {
    pub const EMPTY: Service = Service {
        waiters: TaskQueue::EMPTY,
    };
}

/// Opaque handle to an allocated service slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceHandle(pub(crate) usize);

// ---------------------------------------------------------------------------
// Kernel operations
// ---------------------------------------------------------------------------

impl Kernel {
    /// Hand out the next service slot. Slots are never recycled.
    pub fn service_init(&mut self) -> Result<ServiceHandle, ErrorCode> {
        if self.service_count >= self.services.len() {
            return Err(ErrorCode::MaxServicesReached);
        }
        let handle = ServiceHandle(self.service_count);
        self.service_count += 1;
        Ok(handle)
    }

    /// Park the current task on `service`, recording where the next
    /// published value should be written. The caller must follow up
    /// with yield semantics; the Waiting state keeps the task off the
    /// ready queues until a publish releases it.
    pub fn service_subscribe(
        &mut self,
        service: ServiceHandle,
        slot: *mut i16,
    ) -> Result<(), ErrorCode> {
        let cur = self.cur;
        if self.tasks[cur].class == TaskClass::Periodic {
            return Err(ErrorCode::PeriodicSubscribed);
        }

        self.services[service.0].waiters.enqueue(&mut self.tasks, cur);
        self.tasks[cur].state = TaskState::Waiting;
        self.tasks[cur].value = slot;
        Ok(())
    }

    /// Deposit `value` with every waiter and make them ready, system
    /// waiters ahead of everything else in their queue. Returns whether
    /// the publisher must be preempted because a system-class waiter
    /// woke above it.
    pub fn service_publish(
        &mut self,
        service: ServiceHandle,
        value: i16,
    ) -> Result<bool, ErrorCode> {
        let mut interrupt = false;

        while let Some(idx) = self.services[service.0].waiters.dequeue(&mut self.tasks) {
            if self.tasks[idx].state != TaskState::Waiting {
                continue;
            }

            // Safety: the slot was recorded by subscribe and points into
            // the waiter's live stack; the waiter stays suspended until
            // after this write.
            unsafe { *self.tasks[idx].value = value };
            self.tasks[idx].value = core::ptr::null_mut();
            self.tasks[idx].state = TaskState::Ready;

            match self.tasks[idx].class {
                TaskClass::System => {
                    if self.tasks[self.cur].class != TaskClass::System {
                        interrupt = true;
                    }
                    self.system_queue.push(&mut self.tasks, idx);
                }
                TaskClass::RoundRobin => {
                    self.rr_queue.push(&mut self.tasks, idx);
                }
                _ => return Err(ErrorCode::PeriodicFoundSubscribed),
            }
        }

        Ok(interrupt)
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_SERVICES;
    use crate::kernel::KernelRequest;
    use crate::task::CreateArgs;

    extern "C" fn noop() {}

    fn booted() -> Kernel {
        let mut k = Kernel::new();
        k.bootstrap(noop).unwrap();
        k
    }

    fn turn(k: &mut Kernel, req: KernelRequest) {
        k.request = req;
        k.handle_request().unwrap();
        k.dispatch().unwrap();
    }

    fn spawn(k: &mut Kernel, class: TaskClass) -> usize {
        turn(
            k,
            KernelRequest::TaskCreate(CreateArgs {
                entry: noop,
                class,
                arg: 0,
                period: 10,
                wcet: 1,
                start: 0,
            }),
        );
        k.create_result as usize - 1
    }

    /// Subscribe on behalf of the current task: record the slot, then
    /// run the yield that every subscriber issues.
    fn subscribe(k: &mut Kernel, s: ServiceHandle, slot: *mut i16) {
        k.service_subscribe(s, slot).unwrap();
        turn(k, KernelRequest::TaskNext);
    }

    #[test]
    fn services_are_bump_allocated() {
        let mut k = booted();
        for i in 0..MAX_SERVICES {
            assert_eq!(k.service_init().unwrap(), ServiceHandle(i));
        }
        assert_eq!(k.service_init(), Err(ErrorCode::MaxServicesReached));
    }

    #[test]
    fn subscriber_waits_until_published() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let mut slot: i16 = 0;

        // main (system) subscribes and blocks
        subscribe(&mut k, s, &mut slot);
        assert_eq!(k.tasks[0].state, TaskState::Waiting);
        assert!(k.system_queue.is_empty());
        assert_eq!(k.cur, crate::config::IDLE_INDEX);

        // idle cannot publish, so drive the publish directly
        let preempt = k.service_publish(s, 7).unwrap();
        assert_eq!(slot, 7);
        assert_eq!(k.tasks[0].state, TaskState::Ready);
        assert!(k.services[s.0].waiters.is_empty());
        // idle is below system class, so the publisher side would yield
        assert!(preempt);
    }

    #[test]
    fn publish_wakes_every_waiter_with_the_same_value() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let (mut sys_slot, mut rr_slot): (i16, i16) = (0, 0);

        let sys = spawn(&mut k, TaskClass::System);
        let rr = spawn(&mut k, TaskClass::RoundRobin);
        let publisher = spawn(&mut k, TaskClass::RoundRobin);

        // main hands over to the system worker, which subscribes
        turn(&mut k, KernelRequest::TaskTerminate);
        assert_eq!(k.cur, sys);
        subscribe(&mut k, s, &mut sys_slot);

        // the round-robin worker subscribes too
        assert_eq!(k.cur, rr);
        subscribe(&mut k, s, &mut rr_slot);
        assert_eq!(k.cur, publisher);

        // the publisher (round-robin) publishes: both wake, and the
        // publisher must be preempted for the system waiter
        let preempt = k.service_publish(s, 7).unwrap();
        assert!(preempt);
        assert_eq!(sys_slot, 7);
        assert_eq!(rr_slot, 7);
        assert_eq!(k.tasks[sys].state, TaskState::Ready);
        assert_eq!(k.tasks[rr].state, TaskState::Ready);
        assert!(k.services[s.0].waiters.is_empty());

        // the publisher's interrupt request puts the system waiter on
        // the processor and keeps the publisher at the queue head
        turn(&mut k, KernelRequest::TaskInterrupt);
        assert_eq!(k.cur, sys);
        assert_eq!(k.rr_queue.head, Some(publisher));
    }

    #[test]
    fn woken_waiters_restart_ahead_of_the_queue() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let (mut slot_a, mut slot_b): (i16, i16) = (0, 0);

        let a = spawn(&mut k, TaskClass::RoundRobin);
        let b = spawn(&mut k, TaskClass::RoundRobin);
        let c = spawn(&mut k, TaskClass::RoundRobin);

        turn(&mut k, KernelRequest::TaskTerminate);
        assert_eq!(k.cur, a);
        subscribe(&mut k, s, &mut slot_a);
        assert_eq!(k.cur, b);
        subscribe(&mut k, s, &mut slot_b);
        assert_eq!(k.cur, c);

        // c publishes; a and b jump back in at the head, in reverse of
        // their subscription order
        k.service_publish(s, 3).unwrap();
        assert_eq!(k.rr_queue.head, Some(b));
        assert_eq!(k.tasks[b].next, Some(a));
    }

    #[test]
    fn system_publisher_is_not_preempted() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let mut slot: i16 = 0;

        let sys = spawn(&mut k, TaskClass::System);
        turn(&mut k, KernelRequest::TaskTerminate);
        assert_eq!(k.cur, sys);
        subscribe(&mut k, s, &mut slot);

        // main is gone; bring up a fresh system publisher
        let publisher = spawn(&mut k, TaskClass::System);
        turn(&mut k, KernelRequest::TaskNext);
        assert_eq!(k.cur, publisher);

        let preempt = k.service_publish(s, 1).unwrap();
        assert!(!preempt);
        assert_eq!(slot, 1);
    }

    #[test]
    fn periodic_tasks_cannot_subscribe() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let mut slot: i16 = 0;

        let p = spawn(&mut k, TaskClass::Periodic);
        turn(&mut k, KernelRequest::TaskTerminate);
        assert_eq!(k.cur, p);

        assert_eq!(
            k.service_subscribe(s, &mut slot),
            Err(ErrorCode::PeriodicSubscribed)
        );
    }

    #[test]
    fn periodic_waiter_found_by_publish_is_fatal() {
        let mut k = booted();
        let s = k.service_init().unwrap();
        let mut slot: i16 = 0;

        let p = spawn(&mut k, TaskClass::Periodic);
        // force the invariant violation a subscribe would have refused
        k.services[s.0].waiters.enqueue(&mut k.tasks, p);
        k.tasks[p].state = TaskState::Waiting;
        k.tasks[p].value = &mut slot;

        assert_eq!(
            k.service_publish(s, 9),
            Err(ErrorCode::PeriodicFoundSubscribed)
        );
    }
}
