//! CLI argument struct.
//!
//! Kept as its own module (rather than folded into `cli/mod.rs`) to match
//! the teacher's one-struct-per-command convention, even though this crate
//! exposes a single top-level command.

use std::path::PathBuf;

use clap::Parser;

use crate::archive::Codec;

/// Build a PATRICIA-trie full-text index over a corpus directory, then
/// search it — once against the directory trie, once against the
/// resulting archive.
#[derive(Parser, Debug)]
#[command(name = "patricia-search", version, about, after_help = "\
EXAMPLES:\n  \
patricia-search --entrypoint ./maildir --search-for good morning\n  \
patricia-search --entrypoint ./corpus --search-for project status --compression xz\n  \
patricia-search --entrypoint ./corpus --search-for urgent --no-archive --keep-staging")]
pub struct Args {
    /// Corpus root directory to index.
    #[arg(long)]
    pub entrypoint: PathBuf,

    /// Query terms, joined by spaces into one phrase query.
    #[arg(long, num_args = 1.., required = true)]
    pub search_for: Vec<String>,

    /// Staging directory for in-progress postings (default: a sibling
    /// `.staging` next to the index directory).
    #[arg(long)]
    pub staging_dir: Option<PathBuf>,

    /// Index root directory (default: a sibling `.index` next to the
    /// entrypoint).
    #[arg(long)]
    pub index_dir: Option<PathBuf>,

    /// Directory the final archive is written into (default: the index
    /// directory's parent).
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,

    /// Name for the corpus, used as the archive's basename (default: the
    /// entrypoint directory's own name).
    #[arg(long)]
    pub corpus_name: Option<String>,

    /// Archive compression codec.
    #[arg(long, value_enum, default_value = "gzip")]
    pub compression: CompressionArg,

    /// Keep the staging directory after a successful build.
    #[arg(long)]
    pub keep_staging: bool,

    /// Skip archiving; only the directory trie is built and searched.
    #[arg(long)]
    pub no_archive: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionArg {
    Gzip,
    Bzip2,
    Xz,
    None,
}

impl From<CompressionArg> for Codec {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::Gzip => Codec::Gzip,
            CompressionArg::Bzip2 => Codec::Bzip2,
            CompressionArg::Xz => Codec::Xz,
            CompressionArg::None => Codec::None,
        }
    }
}
