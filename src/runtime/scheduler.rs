//! Pool-backed scheduling for cooperative tasks.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use tracing::warn;

use crate::pool::{Pool, PoolInner};

/// A lightweight, cloneable view over a [`Pool`] for cooperative tasks.
///
/// Cloning is cheap and handles are `'static`, so they can be captured
/// into task bodies. A handle does not keep the pool's workers alive:
/// dropping the owning `Pool` still stops and joins them, after which
/// [`Scheduler::schedule`] resumes inline and [`Scheduler::post`] drops
/// the continuation.
#[derive(Clone)]
pub struct Scheduler {
    pool: Arc<PoolInner>,
}

impl Scheduler {
    /// Creates a scheduler view over `pool`.
    #[must_use]
    pub fn new(pool: &Pool) -> Self {
        Self {
            pool: pool.shared(),
        }
    }

    /// Yields the current task to the pool.
    ///
    /// Awaiting the returned future suspends the task and reposts its
    /// continuation through the pool's `submit`; the task resumes on some
    /// pool worker, letting other queued work run in between.
    #[must_use]
    pub fn schedule(&self) -> Yield {
        Yield {
            scheduler: self.clone(),
            reposted: false,
        }
    }

    /// Submits a bare continuation to the pool.
    ///
    /// For awaiters that already hold a waker and need it to run on a pool
    /// worker — the sleep timer hands its continuation back through here.
    /// After shutdown the waker is dropped; the continuation never runs.
    pub fn post(&self, waker: Waker) {
        if self.repost(waker) {
            return;
        }
        warn!("continuation posted to a stopped pool; dropping it");
    }

    fn repost(&self, waker: Waker) -> bool {
        self.pool.submit(Box::new(move || waker.wake())).is_ok()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler").finish_non_exhaustive()
    }
}

/// Future returned by [`Scheduler::schedule`].
#[derive(Debug)]
pub struct Yield {
    scheduler: Scheduler,
    reposted: bool,
}

impl Future for Yield {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = self.get_mut();
        if this.reposted {
            return Poll::Ready(());
        }
        this.reposted = true;
        if this.scheduler.repost(cx.waker().clone()) {
            Poll::Pending
        } else {
            // Stopped pool: resuming inline beats stranding the task.
            warn!("schedule() on a stopped pool; resuming inline");
            Poll::Ready(())
        }
    }
}
