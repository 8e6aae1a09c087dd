//! Timed suspension for cooperative tasks.
//!
//! [`sleep_for`] suspends the awaiting task for at least a given duration
//! and resumes it on a pool worker. Precision is best-effort; there is no
//! drift correction.

mod sleep;

pub use sleep::{sleep_for, SleepFor};
