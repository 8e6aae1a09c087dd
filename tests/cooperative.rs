//! Cooperative runtime behavior: tasks, scheduling, sleep, and the bridge.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use elasync::test_utils::init_test_logging;
use elasync::{sleep_for, sync_wait, DetachedTask, Latch, Pool, PoolKind, Scheduler, Task};

/// Sums `i * i` over `[begin, end)`, yielding to the pool every
/// `yield_every` terms.
fn sum_squares(begin: u64, end: u64, yield_every: u64, sched: Scheduler) -> Task<u64> {
    Task::new(async move {
        let mut acc = 0u64;
        let mut i = begin;
        while i < end {
            let limit = end.min(i + yield_every);
            while i < limit {
                acc += i * i;
                i += 1;
            }
            if i < end {
                sched.schedule().await;
            }
        }
        acc
    })
}

/// Iterative Fibonacci, yielding every `yield_every` steps.
fn iterative_fib(n: u32, yield_every: u32, sched: Scheduler) -> Task<u64> {
    Task::new(async move {
        if n < 2 {
            return u64::from(n);
        }
        let mut a = 0u64;
        let mut b = 1u64;
        for i in 2..=n {
            let c = a + b;
            a = b;
            b = c;
            if yield_every > 0 && i % yield_every == 0 {
                sched.schedule().await;
            }
        }
        b
    })
}

/// Three-stage pipeline with a yield between stages: triple, add seven,
/// then sum the even results.
fn pipeline_sum(input: Vec<u64>, sched: Scheduler) -> Task<u64> {
    Task::new(async move {
        let stage1: Vec<u64> = input.iter().map(|x| x * 3).collect();
        sched.schedule().await;

        let stage2: Vec<u64> = stage1.iter().map(|x| x + 7).collect();
        sched.schedule().await;

        stage2.into_iter().filter(|x| x % 2 == 0).sum()
    })
}

#[test]
fn cooperative_sum_squares_matches_reference() {
    init_test_logging();
    let pool = Pool::new_fixed(4, PoolKind::WorkStealingFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let expected: u64 = (1..50000u64).map(|i| i * i).sum();
    assert_eq!(sync_wait(sum_squares(1, 50000, 2048, sched)), expected);
}

#[test]
fn cooperative_fib_matches_reference() {
    let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    assert_eq!(sync_wait(iterative_fib(50, 5, sched)), 12_586_269_025);
}

#[test]
fn cooperative_pipeline_matches_reference() {
    init_test_logging();
    let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let input: Vec<u64> = (1..=10000).collect();
    let expected: u64 = input
        .iter()
        .map(|x| x * 3 + 7)
        .filter(|x| x % 2 == 0)
        .sum();

    assert_eq!(sync_wait(pipeline_sum(input, sched)), expected);
}

#[test]
fn detached_tasks_join_through_a_latch() {
    init_test_logging();
    const WORKERS: usize = 24;
    const ROUNDS: usize = 5000;

    let pool = Pool::new_fixed(4, PoolKind::WorkStealingFixed).expect("valid config");
    let sched = Scheduler::new(&pool);
    let total = Arc::new(AtomicU64::new(0));
    let latch = Arc::new(Latch::new(WORKERS));

    for _ in 0..WORKERS {
        let sched = sched.clone();
        let total = Arc::clone(&total);
        let latch = Arc::clone(&latch);
        DetachedTask::spawn(async move {
            for _ in 0..ROUNDS {
                total.fetch_add(1, Ordering::Relaxed);
                sched.schedule().await;
            }
            latch.count_down();
        });
    }

    latch.wait();
    assert_eq!(total.load(Ordering::Relaxed), (WORKERS * ROUNDS) as u64);
}

#[test]
fn awaited_task_resumes_its_awaiter_with_the_result() {
    let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let resumes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&resumes);
    let inner = Task::new(async move {
        sched.schedule().await;
        21u32
    });
    let outer = Task::new(async move {
        let value = inner.await;
        seen.fetch_add(1, Ordering::SeqCst);
        value * 2
    });

    assert_eq!(sync_wait(outer), 42);
    assert_eq!(resumes.load(Ordering::SeqCst), 1);
}

#[test]
fn sync_wait_reraises_a_panic_from_beyond_a_suspension_point() {
    init_test_logging();
    let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let result = std::panic::catch_unwind(|| {
        sync_wait(Task::new(async move {
            sched.schedule().await;
            panic!("pipeline stage failed");
        }));
    });

    let payload = result.unwrap_err();
    let message = payload.downcast_ref::<&str>().copied();
    assert_eq!(message, Some("pipeline stage failed"));
}

#[test]
fn sleep_resumes_on_a_pool_worker() {
    init_test_logging();
    let pool = Pool::new_fixed(2, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let thread_name = sync_wait(Task::new(async move {
        sleep_for(Duration::from_millis(20), sched).await;
        std::thread::current()
            .name()
            .map(str::to_owned)
            .unwrap_or_default()
    }));

    assert!(
        thread_name.starts_with("elasync-worker-"),
        "sleep resumed on {thread_name:?} instead of a pool worker"
    );
}

#[test]
fn sleep_waits_at_least_the_requested_duration() {
    let pool = Pool::new_fixed(1, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let start = Instant::now();
    sync_wait(Task::new(async move {
        sleep_for(Duration::from_millis(30), sched).await;
    }));
    assert!(start.elapsed() >= Duration::from_millis(30));
}

#[test]
fn zero_sleep_completes_without_suspending() {
    let pool = Pool::new_fixed(1, PoolKind::ClassicFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let start = Instant::now();
    sync_wait(Task::new(async move {
        sleep_for(Duration::ZERO, sched).await;
    }));
    assert!(start.elapsed() < Duration::from_millis(250));
}

#[test]
fn mixed_workload_over_one_pool() {
    init_test_logging();
    let pool = Pool::new_fixed(4, PoolKind::WorkStealingFixed).expect("valid config");
    let sched = Scheduler::new(&pool);

    let sleeper = sched.clone();
    let combined = Task::new(async move {
        let squares = sum_squares(1, 2000, 256, sleeper.clone());
        let fib = iterative_fib(40, 4, sleeper.clone());
        sleep_for(Duration::from_millis(5), sleeper).await;
        squares.await + fib.await
    });

    let expected: u64 = (1..2000u64).map(|i| i * i).sum::<u64>() + 102_334_155;
    assert_eq!(sync_wait(combined), expected);
}
