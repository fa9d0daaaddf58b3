//! Top-level orchestrator: clean the output directories, ingest and
//! write postings concurrently, fold the token universe into a trie,
//! move the staged postings in, then optionally archive it. Mirrors the
//! original's `analyze` phase order (cleanup -> index -> archive), with
//! ingestion and postings-writing running concurrently rather than as
//! separate phases — nothing about writing a token's postings depends on
//! the rest of the corpus having been read yet.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use crate::archive::{archive_corpus, Codec};
use crate::error::{Result, SearchError};
use crate::ingest::ingest_corpus;
use crate::mover::move_all_postings;
use crate::pool::{IoPool, WorkerPool};
use crate::stopwatch::Stopwatch;
use crate::trie::build_trie;
use crate::writer::{run_writers, DEFAULT_SPILL_THRESHOLD};

/// Everything a build run needs to know; see `cli::args` for how these
/// map onto command-line flags.
pub struct BuildOptions {
    pub corpus_root: PathBuf,
    pub staging_dir: PathBuf,
    pub index_dir: PathBuf,
    pub corpus_name: String,
    pub archive: bool,
    pub codec: Codec,
    pub keep_staging: bool,
    pub writer_workers: usize,
    pub spill_threshold: usize,
}

impl BuildOptions {
    pub fn new(corpus_root: PathBuf, staging_dir: PathBuf, index_dir: PathBuf, corpus_name: String) -> Self {
        let writer_workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            corpus_root,
            staging_dir,
            index_dir,
            corpus_name,
            archive: true,
            codec: Codec::Gzip,
            keep_staging: false,
            writer_workers,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
        }
    }
}

/// Build the index described by `opts`, returning the path of the final
/// artifact: the index directory if `opts.archive` is false, or the
/// archive file otherwise.
pub fn build_index(opts: &BuildOptions) -> Result<PathBuf> {
    if !opts.corpus_root.is_dir() {
        return Err(SearchError::DirNotFound(opts.corpus_root.display().to_string()));
    }

    {
        let _sw = Stopwatch::start("cleanup");
        reset_dir(&opts.staging_dir)?;
        reset_dir(&opts.index_dir)?;
    }

    let universe = {
        let _sw = Stopwatch::start("ingest+write");
        let (records_tx, records_rx) = mpsc::channel();
        thread::scope(|scope| -> Result<_> {
            let staging_dir = opts.staging_dir.clone();
            let writer_workers = opts.writer_workers;
            let threshold = opts.spill_threshold;
            let writer_handle = scope.spawn(move || run_writers(&staging_dir, writer_workers, threshold, records_rx));

            let cpu_pool = WorkerPool::for_cpu_bound_work();
            let universe = ingest_corpus(&opts.corpus_root, &cpu_pool, records_tx);

            writer_handle.join().expect("writer thread panicked")?;
            Ok(universe)
        })?
    };

    let leaves = {
        let _sw = Stopwatch::start("trie");
        let cpu_pool = WorkerPool::for_cpu_bound_work();
        build_trie(universe, &opts.index_dir, &cpu_pool)?
    };
    tracing::info!(leaves, "trie built");

    {
        let _sw = Stopwatch::start("move-postings");
        let io_pool = IoPool::for_io_fanout();
        let moved = move_all_postings(&opts.staging_dir, &opts.index_dir, &io_pool)?;
        tracing::info!(moved, "postings moved into trie");
    }

    if !opts.keep_staging {
        let _ = fs::remove_dir_all(&opts.staging_dir);
    }

    if opts.archive {
        let _sw = Stopwatch::start("archive");
        archive_corpus(&opts.index_dir, &opts.corpus_name, opts.codec, &WorkerPool::for_cpu_bound_work())
    } else {
        Ok(opts.index_dir.clone())
    }
}

fn reset_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .map_err(|source| SearchError::StagingConflict { path: path.display().to_string(), source })?;
    }
    fs::create_dir_all(path)?;
    Ok(())
}
