//! Cooperative task runtime layered on the pool.
//!
//! A [`Task`] is a suspendable computation: created suspended, started by
//! its first awaiter (or [`Task::start`]), and suspended only at explicit
//! await points — [`Scheduler::schedule`],
//! [`sleep_for`](crate::time::sleep_for), or awaiting another task. When a
//! task completes it resumes the task awaiting it; the resume chain runs
//! through a trampoline, so it never grows the stack.
//!
//! - [`Task`]: awaitable task carrying a value or a captured panic
//! - [`Scheduler`]: cloneable pool view; `schedule()` yields to the pool
//! - [`DetachedTask`]: fire-and-forget task; aborts the process on panic
//! - [`sync_wait`]: blocks an outer thread until a task settles
//! - [`Latch`]: counted completion latch for joining detached work

mod detached;
mod frame;
mod latch;
mod scheduler;
mod sync_wait;
mod task;

pub use detached::DetachedTask;
pub use latch::Latch;
pub use scheduler::{Scheduler, Yield};
pub use sync_wait::sync_wait;
pub use task::Task;
