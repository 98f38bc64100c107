//! # Intrusive queues and lists
//!
//! All task bookkeeping structures thread through the `prev`/`next`
//! fields of the descriptors themselves, so membership costs no storage
//! beyond the descriptor table. Two shapes exist:
//!
//! - [`TaskQueue`] — a FIFO with an extra head-push for latency-critical
//!   wake-ups. Used for the dead pool, the system and round-robin ready
//!   queues, and every service's waiter queue.
//! - [`TaskList`] — a membership list with removal by index. Used for
//!   the periodic task list, whose members stay put across releases.
//!
//! Links are cleared both when a descriptor is added and when it is
//! removed, so `is_linked` stays truthful and a descriptor can never
//! appear to be in two structures at once.

use crate::task::TaskDescriptor;

// ---------------------------------------------------------------------------
// FIFO queue
// ---------------------------------------------------------------------------

/// Intrusive FIFO of task descriptors, addressed by table index.
#[derive(Debug, Clone, Copy)]
pub struct TaskQueue {
    pub head: Option<usize>,
    pub tail: Option<usize>,
}

impl TaskQueue {
    pub const EMPTY: TaskQueue = TaskQueue { head: None, tail: None };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append a task at the tail.
    pub fn enqueue(&mut self, tasks: &mut [TaskDescriptor], idx: usize) {
        tasks[idx].next = None;
        tasks[idx].prev = self.tail;
        match self.tail {
            Some(t) => tasks[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Insert a task at the head, ahead of every queued peer.
    pub fn push(&mut self, tasks: &mut [TaskDescriptor], idx: usize) {
        tasks[idx].prev = None;
        tasks[idx].next = self.head;
        match self.head {
            Some(h) => tasks[h].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    /// Remove and return the head, if any. The removed descriptor's
    /// links are cleared.
    pub fn dequeue(&mut self, tasks: &mut [TaskDescriptor]) -> Option<usize> {
        let idx = self.head?;
        self.head = tasks[idx].next;
        match self.head {
            Some(h) => tasks[h].prev = None,
            None => self.tail = None,
        }
        tasks[idx].next = None;
        tasks[idx].prev = None;
        Some(idx)
    }

    /// Number of queued tasks. O(n); used by tests and sanity checks.
    pub fn len(&self, tasks: &[TaskDescriptor]) -> usize {
        let mut n = 0;
        let mut cursor = self.head;
        while let Some(i) = cursor {
            n += 1;
            cursor = tasks[i].next;
        }
        n
    }
}

// ---------------------------------------------------------------------------
// Membership list
// ---------------------------------------------------------------------------

/// Intrusive doubly-linked list with removal from any position.
#[derive(Debug, Clone, Copy)]
pub struct TaskList {
    pub head: Option<usize>,
    pub tail: Option<usize>,
}

impl TaskList {
    pub const EMPTY: TaskList = TaskList { head: None, tail: None };

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append a task at the tail.
    pub fn add(&mut self, tasks: &mut [TaskDescriptor], idx: usize) {
        tasks[idx].next = None;
        tasks[idx].prev = self.tail;
        match self.tail {
            Some(t) => tasks[t].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Unlink a task from wherever it sits in the list.
    pub fn remove(&mut self, tasks: &mut [TaskDescriptor], idx: usize) {
        let (prev, next) = (tasks[idx].prev, tasks[idx].next);
        match prev {
            Some(p) => tasks[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => tasks[n].prev = prev,
            None => self.tail = prev,
        }
        tasks[idx].prev = None;
        tasks[idx].next = None;
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskDescriptor;

    fn table() -> [TaskDescriptor; 4] {
        [
            TaskDescriptor::EMPTY,
            TaskDescriptor::EMPTY,
            TaskDescriptor::EMPTY,
            TaskDescriptor::EMPTY,
        ]
    }

    #[test]
    fn queue_is_fifo() {
        let mut tasks = table();
        let mut q = TaskQueue::EMPTY;
        q.enqueue(&mut tasks, 0);
        q.enqueue(&mut tasks, 1);
        q.enqueue(&mut tasks, 2);
        assert_eq!(q.len(&tasks), 3);
        assert_eq!(q.dequeue(&mut tasks), Some(0));
        assert_eq!(q.dequeue(&mut tasks), Some(1));
        assert_eq!(q.dequeue(&mut tasks), Some(2));
        assert_eq!(q.dequeue(&mut tasks), None);
        assert!(q.is_empty());
        assert_eq!(q.tail, None);
    }

    #[test]
    fn push_jumps_the_queue() {
        let mut tasks = table();
        let mut q = TaskQueue::EMPTY;
        q.enqueue(&mut tasks, 0);
        q.enqueue(&mut tasks, 1);
        q.push(&mut tasks, 2);
        assert_eq!(q.dequeue(&mut tasks), Some(2));
        assert_eq!(q.dequeue(&mut tasks), Some(0));
        assert_eq!(q.dequeue(&mut tasks), Some(1));
    }

    #[test]
    fn dequeue_clears_links() {
        let mut tasks = table();
        let mut q = TaskQueue::EMPTY;
        q.enqueue(&mut tasks, 0);
        q.enqueue(&mut tasks, 1);
        let got = q.dequeue(&mut tasks).unwrap();
        assert!(!tasks[got].is_linked());
        // remaining head must not point back at the removed task
        assert_eq!(tasks[1].prev, None);
    }

    #[test]
    fn list_removes_from_any_position() {
        let mut tasks = table();
        let mut l = TaskList::EMPTY;
        l.add(&mut tasks, 0);
        l.add(&mut tasks, 1);
        l.add(&mut tasks, 2);

        // middle
        l.remove(&mut tasks, 1);
        assert_eq!(tasks[0].next, Some(2));
        assert_eq!(tasks[2].prev, Some(0));
        assert!(!tasks[1].is_linked());

        // head
        l.remove(&mut tasks, 0);
        assert_eq!(l.head, Some(2));
        assert_eq!(tasks[2].prev, None);

        // last remaining
        l.remove(&mut tasks, 2);
        assert!(l.is_empty());
        assert_eq!(l.tail, None);
    }

    #[test]
    fn singleton_queue_keeps_ends_consistent() {
        let mut tasks = table();
        let mut q = TaskQueue::EMPTY;
        q.push(&mut tasks, 3);
        assert_eq!(q.head, Some(3));
        assert_eq!(q.tail, Some(3));
        assert_eq!(q.dequeue(&mut tasks), Some(3));
        assert_eq!(q.head, None);
        assert_eq!(q.tail, None);
    }
}
