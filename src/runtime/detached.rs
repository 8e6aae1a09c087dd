//! Fire-and-forget cooperative tasks.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::process;

use futures::FutureExt;

use crate::runtime::frame::Frame;

/// A cooperative task with no awaiter.
///
/// Unlike [`Task`](crate::Task), a detached task begins running as soon as
/// it is spawned — on the spawning thread, up to its first suspension
/// point — and hands nothing back. A panic in the body aborts the process:
/// with no join point, no caller could ever observe the failure.
///
/// Use a [`Latch`](crate::Latch) when the spawner needs to know that a
/// group of detached tasks has finished.
#[derive(Debug)]
pub struct DetachedTask(());

impl DetachedTask {
    /// Spawns `future` and starts it eagerly.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let frame = Frame::new(async move {
            if AssertUnwindSafe(future).catch_unwind().await.is_err() {
                process::abort();
            }
        });
        frame.resume();
        Self(())
    }
}
