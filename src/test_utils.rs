//! Shared helpers for this crate's unit and integration tests.

use std::sync::Once;
use std::time::{Duration, Instant};

static INIT_LOGGING: Once = Once::new();

/// Initialize tracing output for tests.
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Polls `pred` every couple of milliseconds until it holds or `timeout`
/// elapses. Returns the final predicate value.
pub fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    pred()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_sees_an_eventually_true_predicate() {
        let start = Instant::now();
        assert!(wait_until(
            || start.elapsed() >= Duration::from_millis(10),
            Duration::from_millis(500),
        ));
    }

    #[test]
    fn wait_until_reports_timeout() {
        assert!(!wait_until(|| false, Duration::from_millis(10)));
    }
}
