//! Postings writer: each worker accumulates tokens in a local pending map
//! and spills it to per-token `.ind` files under the staging directory.
//!
//! Two synchronization concerns compose here: a worker's own pending map
//! is guarded by a plain `Mutex`, so a spill drains it with
//! `mem::take` under a single short critical section — the insert side
//! never blocks longer than it takes another thread to swap the map out.
//! A second, pool-wide `writer_mutex` is held for the duration of a
//! spill's file writes so that two different workers never append to the
//! same token's `.ind` file at once; this is the only coordination needed
//! across workers, since each worker's pending map is private to it.
//!
//! Rust's channels close (`recv` returns `Err`) once every `Sender` is
//! dropped, which stands in for the sentinel value the original used to
//! tell each writer process when to stop.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use crate::error::Result;
use crate::ingest::IngestRecord;
use crate::path_utils::postings_filename;
use crate::pool::{IoPool, Pool};

/// Number of tokens a worker accumulates before attempting to spill.
pub const DEFAULT_SPILL_THRESHOLD: usize = 1000;

/// Append `sources` (one per line) to `token`'s postings file under
/// `staging_dir`, creating it if needed.
fn flush_entry(staging_dir: &Path, token: &str, sources: &HashSet<String>) -> Result<()> {
    let path = staging_dir.join(postings_filename(token));
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    for source in sources {
        writeln!(file, "{source}")?;
    }
    Ok(())
}

/// A single writer worker's accumulation buffer and spill logic.
struct PostingsWriter {
    pending: Mutex<HashMap<String, HashSet<String>>>,
    waiting: AtomicUsize,
    threshold: usize,
    staging_dir: PathBuf,
    writer_mutex: Arc<Mutex<()>>,
    io_pool: IoPool,
}

impl PostingsWriter {
    fn new(staging_dir: PathBuf, writer_mutex: Arc<Mutex<()>>, threshold: usize) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            waiting: AtomicUsize::new(0),
            threshold,
            staging_dir,
            writer_mutex,
            io_pool: IoPool::for_io_fanout(),
        }
    }

    /// Merge one record's tokens into the pending map, then spill if the
    /// pending-entry threshold is exceeded and the writer mutex is free.
    fn ingest(&self, record: &IngestRecord) -> Result<()> {
        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            for token in &record.tokens {
                pending.entry(token.clone()).or_default().insert(record.source.clone());
            }
        }
        self.waiting.fetch_add(record.tokens.len(), Ordering::SeqCst);

        if self.waiting.load(Ordering::SeqCst) >= self.threshold {
            if let Ok(guard) = self.writer_mutex.try_lock() {
                self.spill_locked(guard)?;
            }
        }
        Ok(())
    }

    /// Drain the pending map and fan its entries out to disk. The caller
    /// must already hold `writer_mutex`; it stays held for the whole
    /// fan-out so no other worker's spill can interleave with this one.
    fn spill_locked(&self, _guard: std::sync::MutexGuard<'_, ()>) -> Result<()> {
        let snapshot = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *pending)
        };
        self.waiting.store(0, Ordering::SeqCst);
        if snapshot.is_empty() {
            return Ok(());
        }

        let staging_dir = self.staging_dir.clone();
        let entries: Vec<(String, HashSet<String>)> = snapshot.into_iter().collect();
        let results = self.io_pool.map(entries, move |(token, sources)| {
            flush_entry(&staging_dir, &token, &sources)
        })?;
        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// Unconditionally acquire the writer mutex and spill any residue.
    /// Called once per worker at shutdown.
    fn finish(self) -> Result<()> {
        let guard = self.writer_mutex.lock().unwrap_or_else(|e| e.into_inner());
        self.spill_locked(guard)
    }
}

/// Run `n_workers` writer threads pulling records off `records_rx` until
/// the channel closes (every sender dropped), each maintaining its own
/// pending map and spilling through the shared `writer_mutex`.
pub fn run_writers(
    staging_dir: &Path,
    n_workers: usize,
    threshold: usize,
    records_rx: mpsc::Receiver<IngestRecord>,
) -> Result<()> {
    let receiver = Arc::new(Mutex::new(records_rx));
    let writer_mutex = Arc::new(Mutex::new(()));
    let errors: Mutex<Vec<crate::error::SearchError>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..n_workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let writer_mutex = Arc::clone(&writer_mutex);
            let staging_dir = staging_dir.to_path_buf();
            let errors = &errors;
            scope.spawn(move || {
                let writer = PostingsWriter::new(staging_dir, writer_mutex, threshold);
                loop {
                    let record = {
                        let rx = receiver.lock().unwrap_or_else(|e| e.into_inner());
                        rx.recv()
                    };
                    match record {
                        Ok(record) => {
                            if let Err(err) = writer.ingest(&record) {
                                errors.lock().unwrap_or_else(|e| e.into_inner()).push(err);
                            }
                        }
                        Err(_) => break,
                    }
                }
                if let Err(err) = writer.finish() {
                    errors.lock().unwrap_or_else(|e| e.into_inner()).push(err);
                }
            });
        }
    });

    let mut errors = errors.into_inner().unwrap_or_else(|e| e.into_inner());
    match errors.pop() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn record(source: &str, tokens: &[&str]) -> IngestRecord {
        IngestRecord {
            source: source.to_string(),
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_single_worker_spills_below_threshold_at_finish() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        tx.send(record("a.txt", &["good", "morning"])).unwrap();
        tx.send(record("b.txt", &["good", "evening"])).unwrap();
        drop(tx);

        run_writers(dir.path(), 1, DEFAULT_SPILL_THRESHOLD, rx).unwrap();

        let good = fs::read_to_string(dir.path().join("good_.ind")).unwrap();
        let mut lines: Vec<&str> = good.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["a.txt", "b.txt"]);

        assert!(fs::read_to_string(dir.path().join("morning_.ind")).unwrap().contains("a.txt"));
        assert!(fs::read_to_string(dir.path().join("evening_.ind")).unwrap().contains("b.txt"));
    }

    #[test]
    fn test_low_threshold_forces_multiple_spills_without_losing_entries() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::channel();
        for i in 0..50 {
            tx.send(record(&format!("f{i}.txt"), &["common", "rare"])).unwrap();
        }
        drop(tx);

        run_writers(dir.path(), 3, 5, rx).unwrap();

        let common = fs::read_to_string(dir.path().join("common_.ind")).unwrap();
        assert_eq!(common.lines().count(), 50);
    }

    #[test]
    fn test_empty_record_stream_produces_no_files() {
        let dir = tempdir().unwrap();
        let (tx, rx) = mpsc::channel::<IngestRecord>();
        drop(tx);
        run_writers(dir.path(), 2, DEFAULT_SPILL_THRESHOLD, rx).unwrap();
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
