//! Wall-clock measurement around a single operation.

use std::time::{Duration, Instant};

use log::info;

/// Run `op`, returning its result together with the elapsed wall-clock time.
///
/// A log line naming the operation is emitted as a side effect. The result is
/// passed through untouched; wrapping a `Result`-returning closure times the
/// call whether it succeeds or fails and leaves the error for the caller to
/// propagate.
pub fn measure<T>(name: &str, op: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let result = op();
    let elapsed = start.elapsed();
    info!("{name} executed in {:.4} seconds.", elapsed.as_secs_f64());
    (result, elapsed)
}
