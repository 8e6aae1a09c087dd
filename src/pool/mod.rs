//! The task execution pool.
//!
//! One [`Pool`] type covers four operating modes, fixed at construction:
//!
//! - [`PoolKind::ClassicFixed`]: `n` workers draining a shared FIFO.
//! - [`PoolKind::ElasticGlobal`]: shared FIFO; the worker count grows on
//!   bursts and decays back to a floor after an idle timeout.
//! - [`PoolKind::WorkStealingFixed`]: `n` workers, one deque each; a worker
//!   pops its own queue LIFO and steals from peers FIFO.
//! - [`PoolKind::WorkStealingElastic`]: work-stealing with an elastic
//!   worker count over a fixed set of queue slots.
//!
//! Every mode exposes the same [`Pool::submit`] surface. Tasks submitted
//! from inside a worker of a work-stealing pool land on that worker's own
//! queue; external submissions are spread round-robin.
//!
//! Shutdown (explicit [`Pool::shutdown`] or drop) is graceful: workers
//! drain all outstanding tasks before exiting, and submissions that lose
//! the race against shutdown fail with
//! [`ErrorKind::SubmitAfterShutdown`](crate::ErrorKind::SubmitAfterShutdown).

mod core;
mod queue;
mod worker;

pub use self::core::{Pool, PoolHandle, PoolKind};

pub(crate) use self::core::PoolInner;

/// A one-shot unit of work accepted by [`Pool::submit`].
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;
