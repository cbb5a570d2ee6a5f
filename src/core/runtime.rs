//! Tokio runtime ownership for the binary.

use std::future::Future;
use std::io;
use std::time::Duration;

/// How long shutdown waits for blocking-pool threads (a sink stuck in a
/// write) before abandoning them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Run `fut` to completion on a fresh multi-threaded runtime, then shut the
/// runtime down without waiting on blocked threads longer than `grace`.
///
/// Dropping a runtime waits for every blocking task, so a sink blocked on a
/// stalled stdout reader would keep the process alive after a drain timeout.
pub fn block_on<F: Future>(fut: F, grace: Duration) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let output = runtime.block_on(fut);
    runtime.shutdown_timeout(grace);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn returns_output() {
        assert_eq!(block_on(async { 7 }, SHUTDOWN_GRACE).unwrap(), 7);
    }

    #[test]
    fn does_not_wait_for_stuck_blocking_task() {
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let started = Instant::now();
        block_on(
            async move {
                tokio::task::spawn_blocking(move || {
                    let _ = gate_rx.recv();
                });
            },
            Duration::from_millis(50),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(gate_tx);
    }
}
