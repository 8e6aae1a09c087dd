//! Blocking bridge from synchronous code into cooperative tasks.

use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};

use futures::FutureExt;

use crate::runtime::task::Task;

/// Outcome slot shared with the inner waiter task.
struct WaitState<T> {
    outcome: Mutex<Option<std::thread::Result<T>>>,
    cv: Condvar,
}

/// Runs `task` to completion and returns its value, blocking the calling
/// thread.
///
/// An inner waiter task awaits `task`, stores the outcome, and notifies;
/// this thread blocks on the condvar until then. A panic captured in the
/// task body is re-raised here verbatim.
///
/// The calling thread must not be a worker of the pool driving the task:
/// on a single-worker pool the task's continuation would queue behind this
/// very wait and the two would deadlock.
///
/// # Example
///
/// ```
/// use elasync::{sync_wait, Task};
///
/// assert_eq!(sync_wait(Task::new(async { 6 * 7 })), 42);
/// ```
pub fn sync_wait<T: Send + 'static>(task: Task<T>) -> T {
    let state = Arc::new(WaitState {
        outcome: Mutex::new(None),
        cv: Condvar::new(),
    });

    let shared = Arc::clone(&state);
    let waiter = Task::new(async move {
        let outcome = AssertUnwindSafe(task).catch_unwind().await;
        *shared
            .outcome
            .lock()
            .expect("sync_wait mutex poisoned") = Some(outcome);
        shared.cv.notify_one();
    });
    waiter.start();

    let mut slot = state.outcome.lock().expect("sync_wait mutex poisoned");
    let outcome = loop {
        match slot.take() {
            Some(outcome) => break outcome,
            None => {
                slot = state.cv.wait(slot).expect("sync_wait mutex poisoned");
            }
        }
    };
    drop(slot);

    match outcome {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}
