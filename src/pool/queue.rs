//! Per-worker task queue for the work-stealing modes.
//!
//! Each worker owns one double-ended queue guarded by its own mutex. The
//! owning worker pushes and pops at the front, so its freshest task runs
//! next; thieves take from the back, where the oldest (and typically
//! coarsest) task sits. Stealing locks the victim's mutex with `try_lock`
//! only, so a thief never blocks on a busy victim.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::pool::Job;

/// A double-ended task buffer with its own lock.
pub(crate) struct WorkerQueue {
    deque: Mutex<VecDeque<Job>>,
}

impl WorkerQueue {
    pub(crate) fn new() -> Self {
        Self {
            deque: Mutex::new(VecDeque::new()),
        }
    }

    /// Pushes a task the owning worker spawned for itself.
    pub(crate) fn push_front(&self, job: Job) {
        self.deque
            .lock()
            .expect("worker queue mutex poisoned")
            .push_front(job);
    }

    /// Pushes an externally submitted task behind the worker's own work.
    pub(crate) fn push_back(&self, job: Job) {
        self.deque
            .lock()
            .expect("worker queue mutex poisoned")
            .push_back(job);
    }

    /// Takes the owning worker's most recent task.
    pub(crate) fn pop_front(&self) -> Option<Job> {
        self.deque
            .lock()
            .expect("worker queue mutex poisoned")
            .pop_front()
    }

    /// Steals the oldest task, if the queue can be locked without waiting.
    pub(crate) fn try_steal_back(&self) -> Option<Job> {
        match self.deque.try_lock() {
            Ok(mut deque) => deque.pop_back(),
            Err(_) => None,
        }
    }
}
