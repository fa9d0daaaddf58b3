//! Worker pools: two explicit, non-inheriting implementations of a shared
//! `Pool` interface, per the REDESIGN FLAGS in spec §9. `WorkerPool` backs
//! CPU-bound batch work (tokenization, trie construction, archive
//! subtrees) at `P = logical-CPU-count` workers; `IoPool` backs the
//! small-write I/O fan-out inside a single postings-writer worker at
//! `P/2` workers. Both are plain compositions over the same internal
//! thread-pool core — no base class, just two named wrappers with
//! different sizing policies, matching "the archiver and searcher take a
//! pool handle whose interface is `map(f, items)` and `shutdown(hard)`".
//!
//! Rust has no forcible-kill primitive for a running OS thread, so "hard"
//! shutdown here means detaching worker handles without joining them
//! (the closest equivalent of `multiprocessing.Pool.terminate()` that
//! doesn't risk blocking a fatal-error exit on in-flight work) rather than
//! actually killing the threads; "graceful" shutdown joins every worker
//! after it drains its queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::{Result, SearchError};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct RawPool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<Option<JoinHandle<()>>>,
}

impl RawPool {
    fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..size)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                Some(thread::spawn(move || loop {
                    let job = receiver.lock().unwrap_or_else(|e| e.into_inner()).recv();
                    match job {
                        // A panicking job must not take the worker thread down with
                        // it — that would starve every job still queued behind it.
                        Ok(job) => { let _ = panic::catch_unwind(AssertUnwindSafe(job)); }
                        Err(_) => break,
                    }
                }))
            })
            .collect();
        Self { sender: Some(sender), workers }
    }

    fn size(&self) -> usize {
        self.workers.len()
    }

    fn execute(&self, job: Job) {
        if let Some(sender) = &self.sender {
            // A send error means every worker has already exited (e.g.
            // after a hard shutdown mid-build); dropping the job is the
            // right behavior on that path.
            let _ = sender.send(job);
        }
    }

    fn shutdown(&mut self, hard: bool) {
        self.sender.take();
        for slot in &mut self.workers {
            if let Some(handle) = slot.take() {
                if hard {
                    drop(handle);
                } else {
                    let _ = handle.join();
                }
            }
        }
    }
}

impl Drop for RawPool {
    fn drop(&mut self) {
        self.shutdown(true);
    }
}

/// Common interface over both pool types: submit work, collect results in
/// submission order, and shut down explicitly (graceful or hard).
pub trait Pool: Sized {
    /// Number of worker threads in this pool.
    fn size(&self) -> usize;

    /// Submit a single unit of work; does not block on its completion.
    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;

    /// Release the pool's workers. `hard = true` detaches them without
    /// waiting for queued work to finish (the fatal-error / scope-exit
    /// path in spec §5); `hard = false` lets every queued job finish.
    fn shutdown(self, hard: bool);

    /// Run `f` over every item in `items` using this pool, returning
    /// results in the same order as `items`. Blocks until all results are
    /// back. If any invocation of `f` panics, that panic is caught on the
    /// worker thread and surfaced here as `SearchError::PoolFailure`
    /// instead of hanging or propagating to the calling thread.
    fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let (tx, rx) = mpsc::channel();
        let n = items.len();
        for (idx, item) in items.into_iter().enumerate() {
            let tx = tx.clone();
            let f = Arc::clone(&f);
            self.execute(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(item)));
                let _ = tx.send((idx, outcome));
            });
        }
        drop(tx);

        let mut results: Vec<Option<R>> = (0..n).map(|_| None).collect();
        for _ in 0..n {
            let (idx, outcome) = rx.recv().map_err(|_| {
                SearchError::PoolFailure("worker pool dropped a job before reporting a result".to_string())
            })?;
            match outcome {
                Ok(value) => results[idx] = Some(value),
                Err(payload) => return Err(SearchError::PoolFailure(panic_message(&payload))),
            }
        }
        Ok(results.into_iter().map(|r| r.expect("every index was filled above")).collect())
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker job panicked".to_string()
    }
}

/// CPU-bound batch work pool, sized to the host's logical CPU count.
pub struct WorkerPool(RawPool);

impl WorkerPool {
    /// Size the pool to `std::thread::available_parallelism()`, falling
    /// back to 4 if the host can't report it.
    pub fn for_cpu_bound_work() -> Self {
        let n = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self(RawPool::new(n))
    }

    #[cfg(test)]
    fn sized(n: usize) -> Self {
        Self(RawPool::new(n))
    }
}

impl Pool for WorkerPool {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.execute(Box::new(job));
    }

    fn shutdown(mut self, hard: bool) {
        self.0.shutdown(hard);
    }
}

/// Small-write I/O fan-out pool, owned by a single postings-writer worker,
/// sized to half the CPU count (minimum 1).
pub struct IoPool(RawPool);

impl IoPool {
    pub fn for_io_fanout() -> Self {
        let n = std::thread::available_parallelism().map(|n| (n.get() / 2).max(1)).unwrap_or(2);
        Self(RawPool::new(n))
    }

    #[cfg(test)]
    fn sized(n: usize) -> Self {
        Self(RawPool::new(n))
    }
}

impl Pool for IoPool {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.0.execute(Box::new(job));
    }

    fn shutdown(mut self, hard: bool) {
        self.0.shutdown(hard);
    }
}
