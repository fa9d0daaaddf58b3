//! # patricia_search — parallel PATRICIA-trie full-text index
//!
//! Builds a full-text search index over a corpus of plain-text files and
//! answers token, word-set, and phrase queries against it. The index is a
//! PATRICIA trie materialized either as a directory tree or as a nested
//! tar archive (optionally gzip/bzip2/xz-compressed).
//!
//! ## Library usage
//!
//! This crate is primarily a CLI tool, but every building block —
//! tokenizer, path resolution, worker pools, ingestion, trie builder,
//! mover, archiver, searcher, orchestrator — is exposed as a library for
//! benchmarking and integration testing.

pub mod archive;
pub mod cli;
pub mod error;
pub mod indexer;
pub mod ingest;
pub mod mover;
pub mod path_utils;
pub mod pool;
pub mod search;
pub mod stopwatch;
pub mod token;
pub mod trie;
pub mod writer;

pub use error::{Result, SearchError};
