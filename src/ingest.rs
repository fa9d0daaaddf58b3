//! Ingestion pipeline: walk the corpus, tokenize every file in parallel,
//! and publish `(source, tokens)` records while accumulating the global
//! token universe.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use ignore::WalkBuilder;

use crate::error::{Result, SearchError};
use crate::token::unique_tokens;
use crate::pool::WorkerPool;

/// One file's relative source path and the unique tokens found in it.
#[derive(Debug, Clone)]
pub struct IngestRecord {
    pub source: String,
    pub tokens: HashSet<String>,
}

/// Enumerate every regular file under `corpus_root`, recursively.
fn walk_corpus_files(corpus_root: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(corpus_root)
        .hidden(false)
        .git_ignore(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .collect()
}

/// Read and tokenize a single file, returning its path relative to
/// `corpus_root` (platform-native separator) and its unique token set.
///
/// Bytes that cannot decode as UTF-8 are replaced rather than dropped, so
/// the file's length and structure survive a read — Rust's `String`
/// cannot carry unpaired surrogates the way Python's `surrogateescape`
/// error handler does, so an exact byte-for-byte round trip through an
/// undecodable file is not representable here; this is the closest
/// faithful substitute.
fn tokenize_file(path: &Path, corpus_root: &Path) -> Result<(String, HashSet<String>)> {
    let bytes = fs::read(path).map_err(|source| SearchError::UnreadableSource {
        path: path.display().to_string(),
        source,
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let tokens = unique_tokens(&text);
    let relative = path.strip_prefix(corpus_root).unwrap_or(path);
    Ok((relative.display().to_string(), tokens))
}

/// Walk `corpus_root`, tokenize every file on `pool`, publish each
/// resulting `(source, tokens)` record to `records_tx`, and return the
/// union of every file's token set (the global token universe).
///
/// A file that cannot be read is logged and skipped: its tokens do not
/// enter the universe and its path is not published.
pub fn ingest_corpus(
    corpus_root: &Path,
    pool: &WorkerPool,
    records_tx: mpsc::Sender<IngestRecord>,
) -> HashSet<String> {
    let files = walk_corpus_files(corpus_root);
    let n = files.len();
    let (result_tx, result_rx) = mpsc::channel::<HashSet<String>>();

    for path in files {
        let records_tx = records_tx.clone();
        let result_tx = result_tx.clone();
        let root = corpus_root.to_path_buf();
        pool.execute(move || {
            let tokens = match tokenize_file(&path, &root) {
                Ok((source, tokens)) => {
                    let _ = records_tx.send(IngestRecord { source, tokens: tokens.clone() });
                    tokens
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable source file");
                    HashSet::new()
                }
            };
            let _ = result_tx.send(tokens);
        });
    }
    drop(result_tx);
    drop(records_tx);

    let mut universe = HashSet::new();
    for _ in 0..n {
        if let Ok(tokens) = result_rx.recv() {
            universe.extend(tokens);
        }
    }
    universe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_ingest_builds_token_universe_and_records() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "good morning friend").unwrap();
        fs::write(dir.path().join("b.txt"), "good evening").unwrap();
        fs::write(dir.path().join("c.txt"), "Good Morning, world!").unwrap();

        let pool = WorkerPool::for_cpu_bound_work();
        let (tx, rx) = mpsc::channel();
        let universe = ingest_corpus(dir.path(), &pool, tx);

        let mut records: Vec<IngestRecord> = rx.try_iter().collect();
        records.sort_by(|a, b| a.source.cmp(&b.source));
        assert_eq!(records.len(), 3);

        let expected: HashSet<String> = ["good", "morning", "friend", "evening", "world"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(universe, expected);
    }

    #[test]
    fn test_ingest_skips_unreadable_files_without_failing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readable.txt"), "good").unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let pool = WorkerPool::for_cpu_bound_work();
        let (tx, _rx) = mpsc::channel();
        let universe = ingest_corpus(dir.path(), &pool, tx);
        assert!(universe.contains("good"));
    }

    #[test]
    fn test_ingest_empty_corpus_yields_empty_universe() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let (tx, _rx) = mpsc::channel();
        let universe = ingest_corpus(dir.path(), &pool, tx);
        assert!(universe.is_empty());
    }
}
