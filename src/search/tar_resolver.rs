//! Nested-tar resolver: walks a `patricia_path`-shaped tree of tar
//! archives one level at a time, decompressing and extracting only the
//! single member needed to continue the descent rather than unpacking
//! the archive to disk.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Cursor, Read};
use std::path::PathBuf;

use super::Lookup;
use crate::archive::Codec;
use crate::error::Result;
use crate::path_utils::{common_prefix, LEAF_POSTINGS_FILENAME};

pub struct TarLookup {
    archive_path: PathBuf,
    codec: Codec,
}

impl TarLookup {
    pub fn new(archive_path: PathBuf, codec: Codec) -> Self {
        Self { archive_path, codec }
    }
}

enum Source {
    TopFile(PathBuf),
    Bytes(Vec<u8>),
}

type Level = (Option<HashSet<String>>, HashMap<String, Vec<u8>>);

fn decode(raw: Box<dyn Read>, codec: Codec) -> Box<dyn Read> {
    match codec {
        Codec::None => raw,
        Codec::Gzip => Box::new(flate2::read::GzDecoder::new(raw)),
        Codec::Bzip2 => Box::new(bzip2::read::BzDecoder::new(raw)),
        Codec::Xz => Box::new(xz2::read::XzDecoder::new(raw)),
    }
}

/// Read one tar level's members: the leaf postings entry, if present,
/// already parsed into lines, and every other entry as the basename it
/// names (its `.tar[.ext]` suffix stripped) mapped to its raw bytes.
fn open_level(source: &Source, codec: Codec) -> Result<Level> {
    let reader: Box<dyn Read> = match source {
        Source::TopFile(path) => Box::new(fs::File::open(path)?),
        Source::Bytes(bytes) => Box::new(Cursor::new(bytes.clone())),
    };
    let mut archive = tar::Archive::new(decode(reader, codec));

    let suffix = format!(".tar{}", codec.extension());
    let mut leaf = None;
    let mut branches = HashMap::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        if name == LEAF_POSTINGS_FILENAME {
            leaf = Some(String::from_utf8_lossy(&buf).lines().map(String::from).collect());
        } else if let Some(child) = name.strip_suffix(&suffix) {
            branches.insert(child.to_string(), buf);
        }
    }
    Ok((leaf, branches))
}

impl TarLookup {
    /// Deepest level compatible with a fuzzy match of `token`, or `None`
    /// if no branch shares even a partial prefix with it.
    fn locate_fuzzy(&self, token: &str) -> Result<Option<Level>> {
        let mut source = Source::TopFile(self.archive_path.clone());
        let mut remaining = token.to_string();
        loop {
            let (leaf, mut branches) = open_level(&source, self.codec)?;
            if remaining.is_empty() {
                return Ok(Some((leaf, branches)));
            }
            let first = remaining.chars().next().expect("non-empty checked above");
            let Some(child_key) = branches.keys().find(|k| k.chars().next() == Some(first)).cloned() else {
                return Ok(None);
            };
            let cp = common_prefix(&remaining, &child_key);
            if cp != child_key && cp != remaining {
                return Ok(None);
            }
            let child_bytes = branches.remove(&child_key).expect("key came from this map");
            if cp == remaining {
                return Ok(Some(open_level(&Source::Bytes(child_bytes), self.codec)?));
            }
            source = Source::Bytes(child_bytes);
            remaining = remaining[cp.len()..].to_string();
        }
    }

    /// The exact node's own leaf postings, reached only via full-match
    /// descents (never via a fuzzy prefix-of-a-longer-node hit).
    fn locate_exact(&self, token: &str) -> Result<Option<HashSet<String>>> {
        let mut source = Source::TopFile(self.archive_path.clone());
        let mut remaining = token.to_string();
        loop {
            let (leaf, branches) = open_level(&source, self.codec)?;
            if remaining.is_empty() {
                return Ok(leaf);
            }
            let first = remaining.chars().next().expect("non-empty checked above");
            let Some(child_key) = branches.keys().find(|k| k.chars().next() == Some(first)).cloned() else {
                return Ok(None);
            };
            let cp = common_prefix(&remaining, &child_key);
            if cp != child_key {
                return Ok(None);
            }
            let child_bytes = branches.into_iter().find(|(k, _)| *k == child_key).expect("key came from this map").1;
            source = Source::Bytes(child_bytes);
            remaining = remaining[cp.len()..].to_string();
        }
    }
}

fn collect_subtree(level: Level, codec: Codec) -> Result<HashSet<String>> {
    let (leaf, branches) = level;
    let mut out = leaf.unwrap_or_default();
    for (_, bytes) in branches {
        let nested = open_level(&Source::Bytes(bytes), codec)?;
        out.extend(collect_subtree(nested, codec)?);
    }
    Ok(out)
}

impl Lookup for TarLookup {
    fn fuzzy(&self, token: &str) -> Result<HashSet<String>> {
        match self.locate_fuzzy(token)? {
            Some(level) => collect_subtree(level, self.codec),
            None => Ok(HashSet::new()),
        }
    }

    fn exact(&self, token: &str) -> Result<HashSet<String>> {
        Ok(self.locate_exact(token)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::archive_corpus;
    use crate::pool::WorkerPool;
    use tempfile::tempdir;

    fn build_and_archive(codec: Codec) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let index_root = dir.path().join("index");
        fs::create_dir_all(index_root.join("good").join("bye")).unwrap();
        fs::write(index_root.join("good").join(LEAF_POSTINGS_FILENAME), "a.txt\n").unwrap();
        fs::write(index_root.join("good").join("bye").join(LEAF_POSTINGS_FILENAME), "b.txt\n").unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let archive = archive_corpus(&index_root, "corpus", codec, &pool).unwrap();
        (dir, archive)
    }

    #[test]
    fn test_exact_reads_this_nodes_own_leaf() {
        let (_dir, archive) = build_and_archive(Codec::None);
        let lookup = TarLookup::new(archive, Codec::None);
        assert_eq!(lookup.exact("good").unwrap(), ["a.txt".to_string()].into());
    }

    #[test]
    fn test_fuzzy_collects_whole_subtree() {
        let (_dir, archive) = build_and_archive(Codec::None);
        let lookup = TarLookup::new(archive, Codec::None);
        let result = lookup.fuzzy("good").unwrap();
        assert_eq!(result, ["a.txt".to_string(), "b.txt".to_string()].into());
    }

    #[test]
    fn test_fuzzy_and_exact_work_through_gzip_codec() {
        let (_dir, archive) = build_and_archive(Codec::Gzip);
        let lookup = TarLookup::new(archive, Codec::Gzip);
        assert_eq!(lookup.fuzzy("good").unwrap().len(), 2);
        assert_eq!(lookup.exact("bye").unwrap(), HashSet::new());
        assert_eq!(lookup.exact("good").unwrap(), ["a.txt".to_string()].into());
    }

    #[test]
    fn test_missing_token_yields_empty() {
        let (_dir, archive) = build_and_archive(Codec::None);
        let lookup = TarLookup::new(archive, Codec::None);
        assert!(lookup.fuzzy("nothing").unwrap().is_empty());
    }
}
