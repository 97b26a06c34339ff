// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory FIFO of pending crash reports.
//!
//! The original is single-threaded and lock-free because its cooperative
//! scheduler serialises access; here we run on a multi-threaded Tokio
//! runtime, so the same externally-observable FIFO contract is implemented
//! with a `Mutex`-protected state instead.
//!
//! The active-worker reservation count lives in the same `Mutex` as the
//! queue contents, not beside it. `WorkerPool` needs "push an item, and tell
//! me whether to spawn a worker" and "pop an item, and if there isn't one,
//! give up my reservation" to each be a single atomic step; splitting the
//! queue and the count across two locks is exactly what let a `notify_added`
//! race a worker's exit and strand a report.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::report::CrashReport;

struct State {
    items: VecDeque<CrashReport>,
    active: usize,
}

pub struct SaveQueue {
    inner: Mutex<State>,
}

impl Default for SaveQueue {
    fn default() -> Self {
        Self {
            inner: Mutex::new(State {
                items: VecDeque::new(),
                active: 0,
            }),
        }
    }
}

impl SaveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a report to the tail of the queue without touching the
    /// active-worker reservation. Used for the already-active-worker retry
    /// path, where no new worker needs to be spawned.
    pub fn add(&self, report: CrashReport) {
        self.inner.lock().unwrap().items.push_back(report);
    }

    /// Removes and returns the least-recently-added report, if any, without
    /// touching the active-worker reservation.
    pub fn next(&self) -> Option<CrashReport> {
        self.inner.lock().unwrap().items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of workers the queue currently believes are active.
    pub fn active_workers(&self) -> usize {
        self.inner.lock().unwrap().active
    }

    /// Pushes `report` and, in the same critical section, reserves a worker
    /// slot if fewer than `bound` are active. Returns `true` when the caller
    /// holds a fresh reservation and must spawn a worker to claim it.
    pub(crate) fn add_and_reserve(&self, report: CrashReport, bound: usize) -> bool {
        let mut state = self.inner.lock().unwrap();
        state.items.push_back(report);
        if state.active < bound {
            state.active += 1;
            true
        } else {
            false
        }
    }

    /// Pops the next report for an already-reserved worker. When the queue
    /// is empty this releases that worker's reservation in the same lock
    /// acquisition, so a concurrent `add_and_reserve` can never observe an
    /// `active` count that is about to drop without seeing the drop itself.
    pub(crate) fn next_or_release(&self) -> Option<CrashReport> {
        let mut state = self.inner.lock().unwrap();
        match state.items.pop_front() {
            Some(report) => Some(report),
            None => {
                state.active -= 1;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Dumps, Metadata};

    fn report(id: &str) -> CrashReport {
        CrashReport::new(Metadata::new(), Dumps::new(), id.to_string())
    }

    #[test]
    fn fifo_ordering() {
        let queue = SaveQueue::new();
        queue.add(report("a"));
        queue.add(report("b"));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next().unwrap().crash_id, "a");
        assert_eq!(queue.next().unwrap().crash_id, "b");
        assert!(queue.next().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn reserve_respects_bound() {
        let queue = SaveQueue::new();
        assert!(queue.add_and_reserve(report("a"), 1));
        assert_eq!(queue.active_workers(), 1);
        assert!(!queue.add_and_reserve(report("b"), 1));
        assert_eq!(queue.active_workers(), 1);
    }

    #[test]
    fn release_happens_with_emptiness_check() {
        let queue = SaveQueue::new();
        assert!(queue.add_and_reserve(report("a"), 1));
        assert!(queue.next_or_release().is_some());
        assert!(queue.next_or_release().is_none());
        assert_eq!(queue.active_workers(), 0);
    }

    #[test]
    fn add_after_release_gets_a_fresh_reservation() {
        let queue = SaveQueue::new();
        assert!(queue.add_and_reserve(report("a"), 1));
        assert!(queue.next_or_release().is_some());
        assert!(queue.next_or_release().is_none());
        // Queue observed empty and the reservation was released; a report
        // added afterwards must get its own runner rather than being
        // stranded on a worker that already decided to exit.
        assert!(queue.add_and_reserve(report("b"), 1));
        assert_eq!(queue.active_workers(), 1);
    }
}
