//! Elasync: a polymorphic task execution pool with a cooperative task runtime.
//!
//! # Overview
//!
//! Elasync multiplexes short, stateless work items onto a bounded set of OS
//! threads. One [`Pool`] type covers four operating modes selected at
//! construction: a fixed-size pool draining a shared FIFO, an elastic pool
//! that grows and shrinks between a floor and a ceiling, and fixed or
//! elastic work-stealing pools with one deque per worker. All four sit
//! behind a single [`Pool::submit`] surface.
//!
//! On top of the pool sits a thin cooperative runtime: awaitable [`Task`]s,
//! a pool-backed [`Scheduler`], fire-and-forget [`DetachedTask`]s, timed
//! suspension via [`sleep_for`], and the blocking [`sync_wait`] bridge.
//!
//! # Core Guarantees
//!
//! - **Graceful drain**: shutdown never cancels queued work; workers drain
//!   every outstanding task before exiting.
//! - **One bad task cannot kill the pool**: panics inside submitted tasks
//!   are caught and discarded by the worker loop.
//! - **Bounded elasticity**: elastic pools never exceed their configured
//!   ceiling and never retire below their floor.
//! - **Stack-safe continuations**: a completing task resumes its awaiter
//!   through a trampoline, so arbitrarily long resume chains run at
//!   constant stack depth.
//!
//! # Module Structure
//!
//! - [`pool`]: the execution pool (modes, submit routing, worker lifecycle)
//! - [`runtime`]: cooperative tasks, the pool scheduler, detached tasks,
//!   the sync-wait bridge, and the completion latch
//! - [`time`]: timed suspension for cooperative tasks
//! - [`error`]: error types
//! - [`test_utils`]: shared helpers for this crate's tests
//!
//! # Example
//!
//! ```
//! use elasync::{sync_wait, Pool, PoolKind, Scheduler, Task};
//!
//! let pool = Pool::new_fixed(4, PoolKind::WorkStealingFixed).expect("valid config");
//! let sched = Scheduler::new(&pool);
//!
//! let task = Task::new(async move {
//!     let mut acc = 0u64;
//!     for i in 0..100u64 {
//!         acc += i;
//!         if i % 32 == 0 {
//!             sched.schedule().await;
//!         }
//!     }
//!     acc
//! });
//!
//! assert_eq!(sync_wait(task), 4950);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod pool;
pub mod runtime;
pub mod test_utils;
pub mod time;

pub use error::{Error, ErrorKind, Result};
pub use pool::{Pool, PoolHandle, PoolKind};
pub use runtime::{sync_wait, DetachedTask, Latch, Scheduler, Task};
pub use time::sleep_for;
