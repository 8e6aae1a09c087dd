//! Sleep future backed by a short-lived timer thread.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use crate::runtime::Scheduler;

/// Suspends the current task for at least `duration`.
///
/// A zero duration completes immediately, without touching a timer thread.
/// Otherwise the continuation is handed to a detached timer thread which
/// sleeps and then posts it back through `scheduler`: the task resumes on
/// a pool worker, never on the timer thread.
///
/// # Example
///
/// ```
/// use elasync::{sleep_for, sync_wait, Pool, PoolKind, Scheduler, Task};
/// use std::time::Duration;
///
/// let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
/// let sched = Scheduler::new(&pool);
/// sync_wait(Task::new(async move {
///     sleep_for(Duration::from_millis(5), sched).await;
/// }));
/// ```
#[must_use]
pub fn sleep_for(duration: Duration, scheduler: Scheduler) -> SleepFor {
    SleepFor {
        duration,
        scheduler,
        armed: false,
    }
}

/// Future returned by [`sleep_for`].
#[derive(Debug)]
pub struct SleepFor {
    duration: Duration,
    scheduler: Scheduler,
    armed: bool,
}

impl Future for SleepFor {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.duration.is_zero() || this.armed {
            return Poll::Ready(());
        }

        this.armed = true;
        let duration = this.duration;
        let scheduler = this.scheduler.clone();
        let waker = cx.waker().clone();
        thread::Builder::new()
            .name("elasync-timer".to_owned())
            .spawn(move || {
                thread::sleep(duration);
                scheduler.post(waker);
            })
            .expect("failed to spawn timer thread");
        Poll::Pending
    }
}
