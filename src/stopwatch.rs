//! Scoped phase timer: logs a phase's start and elapsed time via
//! `tracing`, replacing the original's `async` coroutine-based stopwatch
//! with an RAII guard — there is no event loop here to hand a coroutine
//! to.

use std::time::Instant;

/// Logs `{phase} started` on creation and `{phase} finished in {elapsed}`
/// when dropped.
pub struct Stopwatch {
    phase: &'static str,
    started: Instant,
}

impl Stopwatch {
    pub fn start(phase: &'static str) -> Self {
        tracing::info!(phase, "started");
        Self { phase, started: Instant::now() }
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        tracing::info!(phase = self.phase, elapsed = ?self.started.elapsed(), "finished");
    }
}
