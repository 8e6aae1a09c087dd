//! Counted completion latch.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// Blocks a thread until a fixed number of completions are counted.
///
/// The usual companion of [`DetachedTask`](crate::DetachedTask): each
/// detached task counts down once as its last act, and the spawning thread
/// waits for all of them. `count_down` must be called exactly as many
/// times as the initial count.
pub struct Latch {
    remaining: AtomicUsize,
    mutex: Mutex<()>,
    cv: Condvar,
}

impl Latch {
    /// Creates a latch expecting `count` completions.
    #[must_use]
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            mutex: Mutex::new(()),
            cv: Condvar::new(),
        }
    }

    /// Records one completion, waking waiters on the last one.
    pub fn count_down(&self) {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 {
            let _guard = self.mutex.lock().expect("latch mutex poisoned");
            self.cv.notify_all();
        }
    }

    /// Blocks until the count reaches zero.
    pub fn wait(&self) {
        let mut guard = self.mutex.lock().expect("latch mutex poisoned");
        while self.remaining.load(Ordering::Acquire) != 0 {
            guard = self.cv.wait(guard).expect("latch mutex poisoned");
        }
    }
}

impl fmt::Debug for Latch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Latch")
            .field("remaining", &self.remaining.load(Ordering::Relaxed))
            .finish()
    }
}
