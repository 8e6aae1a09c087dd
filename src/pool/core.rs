//! Pool lifecycle, mode dispatch, and submit routing.
//!
//! The [`Pool`] value owns the workers; everything shared with workers and
//! handles lives in a reference-counted inner. The global-queue modes keep
//! their FIFO and elastic counters in one critical section, so spawn and
//! retire decisions see a consistent snapshot. The work-stealing modes keep
//! per-worker queues lock-free of the pool mutex and reserve the pool mutex
//! for idle parking and slot bookkeeping.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Error, ErrorKind, Result};
use crate::pool::queue::WorkerQueue;
use crate::pool::{worker, Job};

/// Placeholder timeout for the fixed modes, whose workers never retire.
const FIXED_IDLE_TIMEOUT: Duration = Duration::from_millis(200);

/// Distinguishes pools so a worker's thread-local can identify its owner.
static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Operating mode of a [`Pool`], fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Fixed worker count draining one shared FIFO.
    ClassicFixed,
    /// Shared FIFO with the worker count elastic between a floor and a
    /// ceiling.
    ElasticGlobal,
    /// Fixed worker count with per-worker deques and stealing.
    WorkStealingFixed,
    /// Per-worker deques and stealing with an elastic worker count.
    WorkStealingElastic,
}

impl PoolKind {
    /// True for the modes that route through per-worker queues.
    #[must_use]
    pub const fn is_work_stealing(self) -> bool {
        matches!(self, Self::WorkStealingFixed | Self::WorkStealingElastic)
    }
}

/// Shared FIFO and elastic counters for the global-queue modes.
pub(crate) struct GlobalShared {
    pub(crate) queue: VecDeque<Job>,
    /// Live workers, including ones currently executing a task.
    pub(crate) active: usize,
    /// Workers parked on the global condvar.
    pub(crate) idle: usize,
}

/// Slot bookkeeping for the work-stealing modes.
pub(crate) struct WsBookkeeping {
    /// `running[i]` is true while slot `i` owns a live thread.
    pub(crate) running: Vec<bool>,
    /// Join handles, kept per slot so a respawn can reap its predecessor.
    pub(crate) handles: Vec<Option<JoinHandle<()>>>,
    pub(crate) active: usize,
    pub(crate) idle: usize,
}

impl WsBookkeeping {
    fn with_slots(slots: usize) -> Self {
        Self {
            running: vec![false; slots],
            handles: (0..slots).map(|_| None).collect(),
            active: 0,
            idle: 0,
        }
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.running.iter().position(|running| !running)
    }
}

/// State shared between the pool owner, its workers, and handles.
pub(crate) struct PoolInner {
    pub(crate) id: u64,
    pub(crate) kind: PoolKind,
    pub(crate) stop: AtomicBool,

    pub(crate) min_workers: usize,
    pub(crate) max_workers: usize,
    pub(crate) idle_timeout: Duration,

    // Global-queue modes.
    pub(crate) global: Mutex<GlobalShared>,
    pub(crate) global_cv: Condvar,
    global_handles: Mutex<Vec<JoinHandle<()>>>,
    thread_seq: AtomicUsize,

    // Work-stealing modes.
    pub(crate) ws_queues: Vec<WorkerQueue>,
    pub(crate) ws: Mutex<WsBookkeeping>,
    pub(crate) ws_cv: Condvar,
    pub(crate) queued: AtomicUsize,
    rr: AtomicUsize,
}

impl PoolInner {
    fn new(kind: PoolKind, min: usize, max: usize, idle_timeout: Duration) -> Arc<Self> {
        let queue_slots = if kind.is_work_stealing() { max } else { 0 };
        Arc::new(Self {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            stop: AtomicBool::new(false),
            min_workers: min,
            max_workers: max,
            idle_timeout,
            global: Mutex::new(GlobalShared {
                queue: VecDeque::new(),
                active: 0,
                idle: 0,
            }),
            global_cv: Condvar::new(),
            global_handles: Mutex::new(Vec::new()),
            thread_seq: AtomicUsize::new(0),
            ws_queues: (0..queue_slots).map(|_| WorkerQueue::new()).collect(),
            ws: Mutex::new(WsBookkeeping::with_slots(queue_slots)),
            ws_cv: Condvar::new(),
            queued: AtomicUsize::new(0),
            rr: AtomicUsize::new(0),
        })
    }

    pub(crate) fn submit(self: &Arc<Self>, job: Job) -> Result<()> {
        if self.kind.is_work_stealing() {
            self.submit_ws(job)
        } else {
            self.submit_global(job)
        }
    }

    fn submit_global(self: &Arc<Self>, job: Job) -> Result<()> {
        let spawn_extra = {
            let mut shared = self.global.lock().expect("pool mutex poisoned");
            if self.stop.load(Ordering::Acquire) {
                return Err(Error::new(ErrorKind::SubmitAfterShutdown));
            }
            shared.queue.push_back(job);

            // Grow only when nobody idle could take the task we just queued.
            if self.kind == PoolKind::ElasticGlobal
                && shared.idle == 0
                && shared.active < self.max_workers
            {
                shared.active += 1;
                true
            } else {
                false
            }
        };

        if spawn_extra {
            debug!(pool = self.id, "spawning extra worker for burst load");
            self.spawn_global_worker();
        }
        self.global_cv.notify_one();
        Ok(())
    }

    fn submit_ws(self: &Arc<Self>, job: Job) -> Result<()> {
        if self.stop.load(Ordering::Acquire) {
            return Err(Error::new(ErrorKind::SubmitAfterShutdown));
        }

        // A worker of this pool keeps its own spawns hot: front of its own
        // queue, no pool mutex on this path.
        if let Some(worker_id) = worker::current_worker_of(self.id) {
            self.ws_queues[worker_id].push_front(job);
            self.queued.fetch_add(1, Ordering::Release);
            let _guard = self.ws.lock().expect("pool mutex poisoned");
            self.ws_cv.notify_one();
            return Ok(());
        }

        {
            let mut ws = self.ws.lock().expect("pool mutex poisoned");
            if self.stop.load(Ordering::Acquire) {
                return Err(Error::new(ErrorKind::SubmitAfterShutdown));
            }
            let idx = self.rr.fetch_add(1, Ordering::Relaxed) % self.ws_queues.len();
            self.ws_queues[idx].push_back(job);
            self.queued.fetch_add(1, Ordering::Release);

            if self.kind == PoolKind::WorkStealingElastic
                && ws.idle == 0
                && ws.active < self.max_workers
            {
                if let Some(slot) = ws.first_free_slot() {
                    self.spawn_ws_worker(&mut ws, slot);
                }
            }
        }
        self.ws_cv.notify_one();
        Ok(())
    }

    fn spawn_global_worker(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        let seq = self.thread_seq.fetch_add(1, Ordering::Relaxed);
        let handle = thread::Builder::new()
            .name(format!("elasync-worker-{seq}"))
            .spawn(move || {
                if inner.kind == PoolKind::ElasticGlobal {
                    worker::run_global_elastic(&inner);
                } else {
                    worker::run_global_fixed(&inner);
                }
            })
            .expect("failed to spawn pool worker");
        self.global_handles
            .lock()
            .expect("pool mutex poisoned")
            .push(handle);
    }

    /// Attaches a worker thread to `slot`. Caller holds the bookkeeping lock.
    fn spawn_ws_worker(self: &Arc<Self>, ws: &mut WsBookkeeping, slot: usize) {
        // A retired predecessor on this slot has cleared `running` but its
        // handle is still attached; reap it before reusing the slot.
        if let Some(old) = ws.handles[slot].take() {
            let _ = old.join();
        }

        ws.running[slot] = true;
        ws.active += 1;
        let inner = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("elasync-ws-{slot}"))
            .spawn(move || worker::run_ws(&inner, slot))
            .expect("failed to spawn pool worker");
        ws.handles[slot] = Some(handle);
        trace!(pool = self.id, slot, "work-stealing worker spawned");
    }

    /// Stops intake, wakes every worker, and joins them after the drain.
    ///
    /// Idempotent: a second call finds the handle lists already empty.
    pub(crate) fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);

        // Notify under the mutexes so a worker between its predicate check
        // and its wait cannot miss the wake.
        {
            let _shared = self.global.lock().expect("pool mutex poisoned");
            self.global_cv.notify_all();
        }
        {
            let _ws = self.ws.lock().expect("pool mutex poisoned");
            self.ws_cv.notify_all();
        }

        let global: Vec<_> = self
            .global_handles
            .lock()
            .expect("pool mutex poisoned")
            .drain(..)
            .collect();
        for handle in global {
            let _ = handle.join();
        }

        let stealing: Vec<_> = {
            let mut ws = self.ws.lock().expect("pool mutex poisoned");
            ws.handles.iter_mut().filter_map(Option::take).collect()
        };
        for handle in stealing {
            let _ = handle.join();
        }

        debug!(pool = self.id, "pool drained and joined");
    }

    fn active_workers(&self) -> usize {
        if self.kind.is_work_stealing() {
            self.ws.lock().expect("pool mutex poisoned").active
        } else {
            self.global.lock().expect("pool mutex poisoned").active
        }
    }
}

/// A task execution pool.
///
/// The `Pool` value owns the worker threads: dropping it (or calling
/// [`Pool::shutdown`]) stops intake, drains every queued task, and joins
/// the workers. Cloneable views — [`PoolHandle`] and
/// [`Scheduler`](crate::Scheduler) — stay usable for submission while the
/// pool is live and fail with `SubmitAfterShutdown` afterwards.
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Creates a fixed-size pool of `num_workers` threads.
    ///
    /// `kind` selects between [`PoolKind::ClassicFixed`] and
    /// [`PoolKind::WorkStealingFixed`]; the elastic kinds belong to the
    /// elastic constructors.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidConfig`] if `num_workers` is zero or `kind` is
    /// an elastic kind.
    pub fn new_fixed(num_workers: usize, kind: PoolKind) -> Result<Self> {
        if num_workers == 0 {
            return Err(Error::new(ErrorKind::InvalidConfig)
                .with_context("pool requires at least one worker"));
        }
        if matches!(
            kind,
            PoolKind::ElasticGlobal | PoolKind::WorkStealingElastic
        ) {
            return Err(Error::new(ErrorKind::InvalidConfig)
                .with_context("elastic kinds require an elastic constructor"));
        }

        let inner = PoolInner::new(kind, num_workers, num_workers, FIXED_IDLE_TIMEOUT);
        match kind {
            PoolKind::ClassicFixed => {
                {
                    let mut shared = inner.global.lock().expect("pool mutex poisoned");
                    shared.active = num_workers;
                }
                for _ in 0..num_workers {
                    inner.spawn_global_worker();
                }
            }
            PoolKind::WorkStealingFixed => {
                let mut ws = inner.ws.lock().expect("pool mutex poisoned");
                for slot in 0..num_workers {
                    inner.spawn_ws_worker(&mut ws, slot);
                }
            }
            PoolKind::ElasticGlobal | PoolKind::WorkStealingElastic => unreachable!(),
        }

        debug!(pool = inner.id, ?kind, workers = num_workers, "pool started");
        Ok(Self { inner })
    }

    /// Creates an elastic pool over a shared FIFO.
    ///
    /// Spawns `min_workers` immediately. Submissions that find no idle
    /// worker below the `max_workers` ceiling spawn one more; workers idle
    /// past `idle_timeout` retire down to the floor.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidConfig`] unless `1 <= min_workers <= max_workers`.
    pub fn new_elastic_global(
        min_workers: usize,
        max_workers: usize,
        idle_timeout: Duration,
    ) -> Result<Self> {
        check_elastic_bounds(min_workers, max_workers)?;

        let inner = PoolInner::new(
            PoolKind::ElasticGlobal,
            min_workers,
            max_workers,
            idle_timeout,
        );
        {
            let mut shared = inner.global.lock().expect("pool mutex poisoned");
            shared.active = min_workers;
        }
        for _ in 0..min_workers {
            inner.spawn_global_worker();
        }

        debug!(
            pool = inner.id,
            min_workers, max_workers, "elastic pool started"
        );
        Ok(Self { inner })
    }

    /// Creates an elastic work-stealing pool.
    ///
    /// Allocates `max_workers` queue and worker slots up front and spawns
    /// workers onto the first `min_workers` of them. Retired workers free
    /// their slot for respawn; tasks left in a retired worker's queue stay
    /// stealable by live peers.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidConfig`] unless `1 <= min_workers <= max_workers`.
    pub fn new_elastic_work_stealing(
        min_workers: usize,
        max_workers: usize,
        idle_timeout: Duration,
    ) -> Result<Self> {
        check_elastic_bounds(min_workers, max_workers)?;

        let inner = PoolInner::new(
            PoolKind::WorkStealingElastic,
            min_workers,
            max_workers,
            idle_timeout,
        );
        {
            let mut ws = inner.ws.lock().expect("pool mutex poisoned");
            for slot in 0..min_workers {
                inner.spawn_ws_worker(&mut ws, slot);
            }
        }

        debug!(
            pool = inner.id,
            min_workers, max_workers, "elastic work-stealing pool started"
        );
        Ok(Self { inner })
    }

    /// Submits a task for execution.
    ///
    /// In the work-stealing modes a task submitted from inside one of this
    /// pool's workers goes to the front of that worker's own queue;
    /// external submissions are spread round-robin across the queue slots.
    /// Panics inside `task` are caught and discarded by the worker loop.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::SubmitAfterShutdown`] once shutdown has begun.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.submit(Box::new(task))
    }

    /// Returns a cloneable submission handle to this pool.
    #[must_use]
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// The pool's operating mode.
    #[must_use]
    pub fn kind(&self) -> PoolKind {
        self.inner.kind
    }

    /// Number of live workers, counting ones currently executing a task.
    #[must_use]
    pub fn active_workers(&self) -> usize {
        self.inner.active_workers()
    }

    /// Stops intake, drains all queued tasks, and joins every worker.
    ///
    /// Dropping the pool does the same; calling this first makes the
    /// post-shutdown `submit` failure observable.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub(crate) fn shared(&self) -> Arc<PoolInner> {
        Arc::clone(&self.inner)
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.inner.shutdown();
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("kind", &self.inner.kind)
            .field("min_workers", &self.inner.min_workers)
            .field("max_workers", &self.inner.max_workers)
            .field("active_workers", &self.inner.active_workers())
            .finish()
    }
}

/// A cloneable submission handle to a [`Pool`].
///
/// Handles are cheap to clone and `'static`, so tasks running on the pool
/// can capture one and submit follow-up work. A handle does not keep the
/// workers alive: once the owning `Pool` shuts down, [`PoolHandle::submit`]
/// fails with `SubmitAfterShutdown`.
#[derive(Clone)]
pub struct PoolHandle {
    inner: Arc<PoolInner>,
}

impl PoolHandle {
    /// Submits a task; same routing contract as [`Pool::submit`].
    ///
    /// # Errors
    ///
    /// [`ErrorKind::SubmitAfterShutdown`] once shutdown has begun.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.submit(Box::new(task))
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("kind", &self.inner.kind)
            .finish()
    }
}

fn check_elastic_bounds(min_workers: usize, max_workers: usize) -> Result<()> {
    if min_workers == 0 || max_workers == 0 || min_workers > max_workers {
        return Err(Error::new(ErrorKind::InvalidConfig)
            .with_context("elastic pool requires 1 <= min_workers <= max_workers"));
    }
    Ok(())
}
