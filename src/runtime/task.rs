//! Awaitable cooperative tasks.

use std::fmt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures::FutureExt;

use crate::runtime::frame::Frame;

/// Outcome of a task body: its value, or the captured panic payload.
type Outcome<T> = std::thread::Result<T>;

/// Completion slots shared between a task's frame and its awaiter.
struct JoinState<T> {
    outcome: Option<Outcome<T>>,
    waker: Option<Waker>,
}

/// A suspendable computation producing a `T`.
///
/// A `Task` is created suspended. It begins running when first awaited or
/// when [`Task::start`] is called, on the thread doing the awaiting or
/// starting, and thereafter suspends only at explicit await points. On
/// completion it resumes the task awaiting it, exactly once.
///
/// A panic inside the body is captured in the task and re-raised verbatim
/// when the task is awaited.
///
/// # Example
///
/// ```
/// use elasync::{sync_wait, Task};
///
/// let doubled = Task::new(async { 21 * 2 });
/// assert_eq!(sync_wait(doubled), 42);
/// ```
pub struct Task<T> {
    frame: Arc<Frame>,
    state: Arc<Mutex<JoinState<T>>>,
}

impl<T: Send + 'static> Task<T> {
    /// Wraps `future` as a suspended task.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let state = Arc::new(Mutex::new(JoinState {
            outcome: None,
            waker: None,
        }));
        let shared = Arc::clone(&state);
        let frame = Frame::new(async move {
            let outcome = AssertUnwindSafe(future).catch_unwind().await;
            let waker = {
                let mut join = shared.lock().expect("task mutex poisoned");
                join.outcome = Some(outcome);
                join.waker.take()
            };
            // The continuation of a completing task runs after its body.
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        Self { frame, state }
    }

    /// Begins running the task without awaiting it.
    ///
    /// The first call resumes the suspended computation; calling again
    /// while it is live or finished is a no-op. The outcome is still
    /// stored, so the task can be awaited afterwards.
    pub fn start(&self) {
        self.frame.resume();
    }

    /// True once the computation has finished, with a value or a captured
    /// panic.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state
            .lock()
            .expect("task mutex poisoned")
            .outcome
            .is_some()
    }
}

impl<T: Send + 'static> Future for Task<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let finished = {
            let mut join = self.state.lock().expect("task mutex poisoned");
            match join.outcome.take() {
                Some(outcome) => Some(outcome),
                None => {
                    join.waker = Some(cx.waker().clone());
                    None
                }
            }
        };

        match finished {
            Some(Ok(value)) => Poll::Ready(value),
            Some(Err(payload)) => resume_unwind(payload),
            None => {
                // Awaiting is what starts a suspended task.
                self.frame.resume();
                Poll::Pending
            }
        }
    }
}

impl<T> fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::Wake;

    struct NoopWaker;

    impl Wake for NoopWaker {
        fn wake(self: Arc<Self>) {}
    }

    fn noop_context_waker() -> Waker {
        Waker::from(Arc::new(NoopWaker))
    }

    #[test]
    fn task_is_lazy_until_started() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let task = Task::new(async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!task.is_finished());

        task.start();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(task.is_finished());
    }

    #[test]
    fn start_twice_runs_once() {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let task = Task::new(async move {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        task.start();
        task.start();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn poll_after_completion_yields_the_value() {
        let mut task = Task::new(async { 7u32 });
        task.start();

        let waker = noop_context_waker();
        let mut cx = Context::from_waker(&waker);
        assert_eq!(Pin::new(&mut task).poll(&mut cx), Poll::Ready(7));
    }

    #[test]
    fn first_poll_starts_and_finishes_a_synchronous_body() {
        let mut task = Task::new(async { "done" });

        let waker = noop_context_waker();
        let mut cx = Context::from_waker(&waker);
        // The body has no suspension point: the poll that starts it also
        // observes completion on the re-poll.
        match Pin::new(&mut task).poll(&mut cx) {
            Poll::Ready(value) => assert_eq!(value, "done"),
            Poll::Pending => {
                assert!(task.is_finished());
                assert_eq!(Pin::new(&mut task).poll(&mut cx), Poll::Ready("done"));
            }
        }
    }
}
