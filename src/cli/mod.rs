//! CLI entry point: parse arguments, build the index, search it once
//! against the directory trie and once against the resulting archive.

pub mod args;

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::archive::archive_corpus;
use crate::error::{Result, SearchError};
use crate::indexer::{build_index, BuildOptions};
use crate::pool::WorkerPool;
use crate::search::{open_searcher, SearchEngine};
use crate::stopwatch::Stopwatch;
use crate::token::tokens as tokenize_ordered;

pub use args::Args;

pub fn run() {
    let args = Args::parse();
    if let Err(e) = run_inner(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_inner(args: Args) -> Result<()> {
    if !args.entrypoint.is_dir() {
        return Err(SearchError::DirNotFound(args.entrypoint.display().to_string()));
    }

    let corpus_name = args.corpus_name.clone().unwrap_or_else(|| {
        args.entrypoint
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "corpus".to_string())
    });

    let index_dir = args.index_dir.clone().unwrap_or_else(|| sibling_dir(&args.entrypoint, ".index"));
    let staging_dir = args.staging_dir.clone().unwrap_or_else(|| sibling_dir(&args.entrypoint, ".staging"));

    let mut opts = BuildOptions::new(args.entrypoint.clone(), staging_dir, index_dir, corpus_name.clone());
    opts.archive = false;
    opts.keep_staging = args.keep_staging;
    opts.codec = args.compression.into();

    let query = tokenize_ordered(&args.search_for.join(" "));

    let index_path = build_index(&opts)?;
    {
        let _sw = Stopwatch::start("search-directory");
        let searcher = open_searcher(&index_path, &args.entrypoint)?;
        print_results(&query, searcher.as_ref())?;
    }

    if !args.no_archive {
        let archive_dir = args.archive_dir.clone().unwrap_or_else(|| {
            index_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
        });
        let archive_path = {
            let _sw = Stopwatch::start("archive");
            let archived = archive_corpus(&index_path, &corpus_name, opts.codec, &WorkerPool::for_cpu_bound_work())?;
            relocate(&archived, &archive_dir)?
        };
        let _sw = Stopwatch::start("search-archive");
        let searcher = open_searcher(&archive_path, &args.entrypoint)?;
        print_results(&query, searcher.as_ref())?;
    }

    Ok(())
}

fn relocate(archive: &Path, dest_dir: &Path) -> Result<PathBuf> {
    if archive.parent() == Some(dest_dir) {
        return Ok(archive.to_path_buf());
    }
    std::fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(archive.file_name().expect("archive_corpus returns a file path"));
    std::fs::rename(archive, &dest)?;
    Ok(dest)
}

fn print_results(query: &[String], searcher: &dyn SearchEngine) -> Result<()> {
    let hits = match query.len() {
        0 => Default::default(),
        1 => searcher.fuzzy_search(&query[0])?,
        _ => searcher.match_phrase(query, true)?,
    };

    let mut sorted: Vec<&String> = hits.iter().collect();
    sorted.sort();
    for path in &sorted {
        println!("{}", path);
    }
    eprintln!("{} matching source(s)", sorted.len());
    Ok(())
}

fn sibling_dir(entrypoint: &Path, suffix: &str) -> PathBuf {
    let name = entrypoint.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "corpus".to_string());
    entrypoint.parent().unwrap_or_else(|| Path::new(".")).join(format!("{name}{suffix}"))
}
