//! Archiver: fold a built trie into a single nested tar file.
//!
//! The fold is bottom-up and post-order: each directory's subdirectories
//! are folded into sibling `<name>.tar[.ext]` files first, then the
//! directory itself — now holding only its own leaf file(s) plus those
//! freshly created member archives — is packed into its parent's
//! `<name>.tar[.ext]` and removed. Repeating this to the root yields one
//! nested tar whose top-level entry recursively contains the whole tree.
//!
//! Only the top level is dispatched across the worker pool; a directory's
//! own subtree is folded on the calling thread; recursing through the
//! pool would have a pool worker block on a job submitted to its own
//! (necessarily finite) pool.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::pool::{Pool, WorkerPool};

/// Archive compression backend. `None` still produces a `.tar` container,
/// just without a compression pass over it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    None,
    Gzip,
    Bzip2,
    Xz,
}

impl Codec {
    pub(crate) fn extension(self) -> &'static str {
        match self {
            Codec::None => "",
            Codec::Gzip => ".gz",
            Codec::Bzip2 => ".bz2",
            Codec::Xz => ".xz",
        }
    }
}

enum Encoder {
    Plain(fs::File),
    Gzip(flate2::write::GzEncoder<fs::File>),
    Bzip2(bzip2::write::BzEncoder<fs::File>),
    Xz(xz2::write::XzEncoder<fs::File>),
}

impl Encoder {
    fn new(file: fs::File, codec: Codec) -> Self {
        match codec {
            Codec::None => Encoder::Plain(file),
            Codec::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(file, flate2::Compression::default())),
            Codec::Bzip2 => Encoder::Bzip2(bzip2::write::BzEncoder::new(file, bzip2::Compression::default())),
            Codec::Xz => Encoder::Xz(xz2::write::XzEncoder::new(file, 6)),
        }
    }

    fn finish(self) -> io::Result<()> {
        match self {
            Encoder::Plain(mut w) => w.flush(),
            Encoder::Gzip(w) => w.finish().map(|_| ()),
            Encoder::Bzip2(w) => w.finish().map(|_| ()),
            Encoder::Xz(w) => w.finish().map(|_| ()),
        }
    }
}

impl Write for Encoder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Encoder::Plain(w) => w.write(buf),
            Encoder::Gzip(w) => w.write(buf),
            Encoder::Bzip2(w) => w.write(buf),
            Encoder::Xz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Encoder::Plain(w) => w.flush(),
            Encoder::Gzip(w) => w.flush(),
            Encoder::Bzip2(w) => w.flush(),
            Encoder::Xz(w) => w.flush(),
        }
    }
}

/// Pack `dir`'s current entries — basenames, lexicographically sorted —
/// into `<dir's basename>.tar[.ext]` in `dir`'s parent, then remove `dir`.
fn write_archive(dir: &Path, codec: Codec) -> Result<PathBuf> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?.filter_map(|e| e.ok()).map(|e| e.path()).collect();
    entries.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

    let basename = dir.file_name().ok_or_else(|| SearchError::ArchiveReadError {
        path: dir.display().to_string(),
        message: "directory has no file name component".to_string(),
    })?;
    let archive_path = dir.with_file_name(format!("{}.tar{}", basename.to_string_lossy(), codec.extension()));

    let file = fs::File::create(&archive_path)?;
    let mut builder = tar::Builder::new(Encoder::new(file, codec));
    for entry in &entries {
        let name = entry.file_name().expect("directory listing entries always have a file name");
        builder.append_path_with_name(entry, name)?;
    }
    let encoder = builder.into_inner()?;
    encoder.finish()?;

    fs::remove_dir_all(dir)?;
    Ok(archive_path)
}

/// List the immediate subdirectories of `dir`.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|e| e.path())
        .collect())
}

/// Fold `dir`'s subtree into its parent's archive, recursing on the
/// calling thread.
fn fold_dir_sequential(dir: &Path, codec: Codec) -> Result<PathBuf> {
    for sub in subdirectories(dir)? {
        fold_dir_sequential(&sub, codec)?;
    }
    write_archive(dir, codec)
}

/// Fold the whole trie at `index_root` into `<corpus_name>.tar[.ext]`,
/// placed alongside `index_root`, and return its path. `index_root` is
/// consumed in the process.
pub fn archive_corpus(
    index_root: &Path,
    corpus_name: &str,
    codec: Codec,
    pool: &WorkerPool,
) -> Result<PathBuf> {
    let top_level = subdirectories(index_root)?;
    let results = pool.map(top_level, move |sub| fold_dir_sequential(&sub, codec))?;
    for result in results {
        result?;
    }

    let archive_path = write_archive(index_root, codec)?;
    let final_path = archive_path.with_file_name(format!("{corpus_name}.tar{}", codec.extension()));
    fs::rename(&archive_path, &final_path)?;
    Ok(final_path)
}
