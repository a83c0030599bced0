//! Virtual-time scheduler for paced transitions.
//!
//! Time is a plain millisecond counter owned by the caller: nothing here
//! reads a wall clock or sleeps. `tick(now)` releases tasks that are due,
//! `pop_next()` jumps straight to the earliest pending task (used to run a
//! whole autoplay sequence synchronously). Tasks are ordered by due time,
//! then by scheduling order.

use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId {
    pub due_ms: u64,
    seq: u64,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BTreeMap<TaskId, T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Scheduler { now_ms: 0, next_seq: 0, queue: BTreeMap::new() }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn schedule(&mut self, delay_ms: u64, task: T) -> TaskId {
        let id = TaskId { due_ms: self.now_ms.saturating_add(delay_ms), seq: self.next_seq };
        self.next_seq += 1;
        self.queue.insert(id, task);
        id
    }

    /// Drops every pending task; returns how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let n = self.queue.len();
        self.queue.clear();
        n
    }

    /// Moves the clock forward to `now_ms` (never backwards) and releases the
    /// earliest task due at or before it.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<T> {
        self.now_ms = self.now_ms.max(now_ms);
        let first = *self.queue.keys().next()?;
        if first.due_ms > self.now_ms {
            return None;
        }
        self.queue.remove(&first)
    }

    /// Releases the earliest pending task, advancing the clock to its due time.
    pub fn pop_next(&mut self) -> Option<T> {
        let (id, task) = self.queue.pop_first()?;
        self.now_ms = self.now_ms.max(id.due_ms);
        Some(task)
    }
}
