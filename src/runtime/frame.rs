//! Task frames and the resume trampoline.
//!
//! A [`Frame`] owns a type-erased, pinned future: the cooperative task's
//! computation. The frame doubles as the future's waker — waking it
//! schedules a re-poll on the waking thread. Wakes that arrive while the
//! frame is mid-poll coalesce into a single re-poll, and frames woken from
//! inside another frame's poll are queued on a thread-local and drained by
//! a loop, so a chain of tasks resuming one another runs at constant stack
//! depth.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Run state of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    /// Suspended with the future stored; no poll pending.
    Idle,
    /// Queued for a poll.
    Scheduled,
    /// Some thread is polling the future right now.
    Running,
    /// Woken while running; the polling thread re-polls before parking.
    Notified,
    /// The future returned `Ready`; the frame is spent.
    Complete,
}

struct Slot {
    state: RunState,
    future: Option<BoxFuture>,
}

/// A suspended cooperative computation.
pub(crate) struct Frame {
    slot: Mutex<Slot>,
}

impl Frame {
    /// Wraps `future` in a new suspended frame.
    pub(crate) fn new<F>(future: F) -> Arc<Self>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Arc::new(Self {
            slot: Mutex::new(Slot {
                state: RunState::Idle,
                future: Some(Box::pin(future)),
            }),
        })
    }

    /// Schedules the frame for a poll on the current thread.
    ///
    /// No-op if the frame is already queued or complete; a frame mid-poll
    /// is marked so the polling thread re-polls it instead.
    pub(crate) fn resume(self: &Arc<Self>) {
        let run = {
            let mut slot = self.slot.lock().expect("frame mutex poisoned");
            match slot.state {
                RunState::Idle => {
                    slot.state = RunState::Scheduled;
                    true
                }
                RunState::Running => {
                    slot.state = RunState::Notified;
                    false
                }
                RunState::Scheduled | RunState::Notified | RunState::Complete => false,
            }
        };
        if run {
            trampoline(Arc::clone(self));
        }
    }

    /// Polls the stored future until it parks or completes.
    fn run(self: &Arc<Self>) {
        let mut future = {
            let mut slot = self.slot.lock().expect("frame mutex poisoned");
            if slot.state != RunState::Scheduled {
                return;
            }
            slot.state = RunState::Running;
            match slot.future.take() {
                Some(future) => future,
                None => return,
            }
        };

        let waker = Waker::from(Arc::clone(self));
        let mut cx = Context::from_waker(&waker);
        loop {
            match future.as_mut().poll(&mut cx) {
                Poll::Ready(()) => {
                    let mut slot = self.slot.lock().expect("frame mutex poisoned");
                    slot.state = RunState::Complete;
                    return;
                }
                Poll::Pending => {
                    let mut slot = self.slot.lock().expect("frame mutex poisoned");
                    if slot.state == RunState::Notified {
                        slot.state = RunState::Running;
                        continue;
                    }
                    slot.future = Some(future);
                    slot.state = RunState::Idle;
                    return;
                }
            }
        }
    }
}

impl Wake for Frame {
    fn wake(self: Arc<Self>) {
        self.resume();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.resume();
    }
}

thread_local! {
    static RESUME_QUEUE: RefCell<VecDeque<Arc<Frame>>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
}

/// Runs `frame`, plus any frames its poll wakes in turn, in a loop.
///
/// The queue drain replaces recursive resumption: a completing task wakes
/// its awaiter, which lands here and runs after the current poll returns.
fn trampoline(frame: Arc<Frame>) {
    RESUME_QUEUE.with(|queue| queue.borrow_mut().push_back(frame));
    if DRAINING.with(Cell::get) {
        return;
    }
    DRAINING.with(|draining| draining.set(true));
    while let Some(next) = RESUME_QUEUE.with(|queue| queue.borrow_mut().pop_front()) {
        next.run();
    }
    DRAINING.with(|draining| draining.set(false));
}
