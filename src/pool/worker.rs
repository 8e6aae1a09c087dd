//! Worker loop bodies for the four operating modes.
//!
//! All loops execute tasks outside any pool-owned lock, and a panicking
//! task is caught and discarded so the worker survives it. Work-stealing
//! workers register themselves in a thread-local on entry so `submit`
//! called from inside a task can route to the calling worker's own queue.

use std::cell::Cell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::pool::core::{PoolInner, PoolKind, WsBookkeeping};
use crate::pool::Job;

thread_local! {
    /// `(pool id, worker index)` of the work-stealing worker on this thread.
    static CURRENT_WORKER: Cell<Option<(u64, usize)>> = const { Cell::new(None) };
}

/// Index of the calling thread's worker slot, if it belongs to `pool_id`.
pub(crate) fn current_worker_of(pool_id: u64) -> Option<usize> {
    CURRENT_WORKER.with(|current| match current.get() {
        Some((id, worker_id)) if id == pool_id => Some(worker_id),
        _ => None,
    })
}

/// Registers the current thread as a pool worker; clears on drop.
///
/// If a thread ever ran loops for two pools, the most recent owner wins.
struct Registration;

impl Registration {
    fn new(pool_id: u64, worker_id: usize) -> Self {
        CURRENT_WORKER.with(|current| current.set(Some((pool_id, worker_id))));
        Self
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        CURRENT_WORKER.with(Cell::take);
    }
}

/// Runs one task with no lock held, swallowing its panic.
fn run_job(job: Job) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        warn!("pool task panicked; payload discarded");
    }
}

/// Loop body for `ClassicFixed` workers.
pub(crate) fn run_global_fixed(pool: &Arc<PoolInner>) {
    loop {
        let job = {
            let mut shared = pool.global.lock().expect("pool mutex poisoned");
            loop {
                if pool.stop.load(Ordering::Acquire) && shared.queue.is_empty() {
                    shared.active -= 1;
                    return;
                }
                if let Some(job) = shared.queue.pop_front() {
                    break job;
                }
                shared = pool.global_cv.wait(shared).expect("pool mutex poisoned");
            }
        };
        run_job(job);
    }
}

/// Loop body for `ElasticGlobal` workers.
///
/// Identical to the fixed loop except the wait is bounded by the idle
/// timeout: a worker that times out with an empty queue retires, as long
/// as that leaves the pool at or above its floor.
pub(crate) fn run_global_elastic(pool: &Arc<PoolInner>) {
    loop {
        let job = {
            let mut shared = pool.global.lock().expect("pool mutex poisoned");
            shared.idle += 1;
            let (mut shared, wait) = pool
                .global_cv
                .wait_timeout_while(shared, pool.idle_timeout, |s| {
                    !pool.stop.load(Ordering::Acquire) && s.queue.is_empty()
                })
                .expect("pool mutex poisoned");
            shared.idle -= 1;

            if pool.stop.load(Ordering::Acquire) && shared.queue.is_empty() {
                shared.active -= 1;
                return;
            }
            if wait.timed_out() && shared.queue.is_empty() && shared.active > pool.min_workers {
                shared.active -= 1;
                trace!(pool = pool.id, "idle worker retiring");
                return;
            }
            match shared.queue.pop_front() {
                Some(job) => job,
                // Spurious wake, or a peer took the task first.
                None => continue,
            }
        };
        run_job(job);
    }
}

/// Loop body for both work-stealing modes.
pub(crate) fn run_ws(pool: &Arc<PoolInner>, worker_id: usize) {
    let _registration = Registration::new(pool.id, worker_id);

    loop {
        if pool.stop.load(Ordering::Acquire) && pool.queued.load(Ordering::Acquire) == 0 {
            let mut ws = pool.ws.lock().expect("pool mutex poisoned");
            release_slot(&mut ws, worker_id);
            return;
        }

        if let Some(job) = pop_local(pool, worker_id).or_else(|| steal(pool, worker_id)) {
            run_job(job);
            continue;
        }

        // Nothing local and nothing stealable: park on the pool condvar.
        let mut ws = pool.ws.lock().expect("pool mutex poisoned");
        ws.idle += 1;

        if pool.kind == PoolKind::WorkStealingElastic {
            let (mut ws, wait) = pool
                .ws_cv
                .wait_timeout_while(ws, pool.idle_timeout, |_| {
                    !pool.stop.load(Ordering::Acquire)
                        && pool.queued.load(Ordering::Acquire) == 0
                })
                .expect("pool mutex poisoned");
            ws.idle -= 1;

            if pool.stop.load(Ordering::Acquire) && pool.queued.load(Ordering::Acquire) == 0 {
                release_slot(&mut ws, worker_id);
                return;
            }
            if wait.timed_out()
                && pool.queued.load(Ordering::Acquire) == 0
                && ws.active > pool.min_workers
            {
                release_slot(&mut ws, worker_id);
                trace!(pool = pool.id, worker_id, "idle worker retiring");
                return;
            }
        } else {
            let mut ws = pool
                .ws_cv
                .wait_while(ws, |_| {
                    !pool.stop.load(Ordering::Acquire)
                        && pool.queued.load(Ordering::Acquire) == 0
                })
                .expect("pool mutex poisoned");
            ws.idle -= 1;
        }
    }
}

/// Marks the slot free so a future spawn can reuse it.
fn release_slot(ws: &mut WsBookkeeping, worker_id: usize) {
    if ws.running[worker_id] {
        ws.running[worker_id] = false;
        ws.active -= 1;
    }
}

fn pop_local(pool: &PoolInner, worker_id: usize) -> Option<Job> {
    let job = pool.ws_queues[worker_id].pop_front()?;
    pool.queued.fetch_sub(1, Ordering::AcqRel);
    Some(job)
}

/// Probes peers in ring order starting after the thief, taking the back of
/// the first victim whose queue can be locked without waiting. Retired
/// workers' queues are probed too: their leftover tasks stay stealable.
fn steal(pool: &PoolInner, thief: usize) -> Option<Job> {
    let slots = pool.ws_queues.len();
    if slots <= 1 {
        return None;
    }
    for step in 1..slots {
        let victim = (thief + step) % slots;
        if let Some(job) = pool.ws_queues[victim].try_steal_back() {
            pool.queued.fetch_sub(1, Ordering::AcqRel);
            return Some(job);
        }
    }
    None
}
