//! Elastic growth, ceiling, and decay behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use elasync::test_utils::{init_test_logging, wait_until};
use elasync::Pool;

/// Waits for `counter` to reach `expected` while checking that the live
/// worker count never exceeds `ceiling`. Returns the highest count seen.
fn drain_watching_ceiling(
    pool: &Pool,
    counter: &Arc<AtomicUsize>,
    expected: usize,
    ceiling: usize,
    timeout: Duration,
) -> usize {
    let mut peak = 0;
    let finished = wait_until(
        || {
            let live = pool.active_workers();
            peak = peak.max(live);
            assert!(live <= ceiling, "elastic pool exceeded its ceiling: {live}");
            counter.load(Ordering::Relaxed) == expected
        },
        timeout,
    );
    assert!(finished, "elastic pool did not finish {expected} tasks in time");
    peak
}

#[test]
fn elastic_global_executes_burst_workload() {
    init_test_logging();
    const TASKS: usize = 260;

    let pool = Pool::new_elastic_global(2, 8, Duration::from_millis(80)).expect("valid config");
    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..TASKS {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(1));
        })
        .expect("pool is live");
    }

    drain_watching_ceiling(&pool, &counter, TASKS, 8, Duration::from_millis(4000));
    assert_eq!(counter.load(Ordering::Relaxed), TASKS);
}

#[test]
fn elastic_global_grows_under_load_and_decays_to_floor() {
    init_test_logging();
    let pool = Pool::new_elastic_global(2, 6, Duration::from_millis(80)).expect("valid config");
    assert_eq!(pool.active_workers(), 2);

    let counter = Arc::new(AtomicUsize::new(0));
    for _ in 0..120 {
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            counter.fetch_add(1, Ordering::Relaxed);
            thread::sleep(Duration::from_millis(2));
        })
        .expect("pool is live");
    }

    let peak = drain_watching_ceiling(&pool, &counter, 120, 6, Duration::from_millis(4000));
    assert!(peak > 2, "burst load never grew the pool past its floor");

    // Quiescence: workers above the floor retire after the idle timeout.
    assert!(
        wait_until(|| pool.active_workers() == 2, Duration::from_millis(2000)),
        "elastic pool did not decay to its floor"
    );
}

#[test]
fn elastic_work_stealing_executes_nested_workload() {
    init_test_logging();
    const OUTER: usize = 16;
    const INNER: usize = 10;

    let counter = Arc::new(AtomicUsize::new(0));
    let pool =
        Pool::new_elastic_work_stealing(2, 8, Duration::from_millis(80)).expect("valid config");
    let handle = pool.handle();
    for _ in 0..OUTER {
        let handle = handle.clone();
        let counter = Arc::clone(&counter);
        pool.submit(move || {
            for _ in 0..INNER {
                let counter = Arc::clone(&counter);
                handle
                    .submit(move || {
                        counter.fetch_add(1, Ordering::Relaxed);
                        thread::sleep(Duration::from_millis(1));
                    })
                    .expect("pool is live");
            }
        })
        .expect("pool is live");
    }

    drain_watching_ceiling(&pool, &counter, OUTER * INNER, 8, Duration::from_millis(4500));
}

#[test]
fn elastic_work_stealing_decays_and_respawns_into_freed_slots() {
    init_test_logging();
    let pool =
        Pool::new_elastic_work_stealing(1, 4, Duration::from_millis(60)).expect("valid config");
    assert_eq!(pool.active_workers(), 1);

    let run_burst = |expected: usize| {
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..expected {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(1));
            })
            .expect("pool is live");
        }
        assert!(
            wait_until(
                || counter.load(Ordering::Relaxed) == expected,
                Duration::from_millis(4000),
            ),
            "burst did not drain"
        );
    };

    // First burst grows the pool; quiescence shrinks it back.
    run_burst(80);
    assert!(
        wait_until(|| pool.active_workers() == 1, Duration::from_millis(2000)),
        "elastic work-stealing pool did not decay to its floor"
    );

    // A second burst must be able to respawn into the retired slots.
    run_burst(80);
    assert!(
        wait_until(|| pool.active_workers() == 1, Duration::from_millis(2000)),
        "pool did not decay after the second burst"
    );
}
