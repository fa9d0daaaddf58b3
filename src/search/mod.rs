//! Searcher: `fuzzy_search`/`match_words`/`match_phrase` over a `Lookup`
//! that knows how to read one representation of the trie — a plain
//! directory tree ([`fs_resolver`]) or a nested tar archive
//! ([`tar_resolver`]). [`open_searcher`] picks the right one for a given
//! index path.
//!
//! `fuzzy_search` is always a prefix match; `match_words` is always an
//! exact match, one word at a time. `match_phrase` requires exact matches
//! on every token but the last, whose lookup follows the caller's `fuzzy`
//! flag, then verifies the phrase occurs as a contiguous run in the
//! original source text.

mod fs_resolver;
mod tar_resolver;

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::archive::Codec;
use crate::error::{Result, SearchError};
use crate::token::tokens as tokenize_ordered;

pub use fs_resolver::FsLookup;
pub use tar_resolver::TarLookup;

/// Read access to one representation of the trie: look up a token's
/// postings either fuzzily (prefix match, whole subtree) or exactly
/// (this node's own leaf only).
pub trait Lookup {
    fn fuzzy(&self, token: &str) -> Result<HashSet<String>>;
    fn exact(&self, token: &str) -> Result<HashSet<String>>;
}

/// Shared query surface over any [`Lookup`] implementation.
pub struct Searcher<L> {
    lookup: L,
    corpus_root: PathBuf,
}

impl<L: Lookup> Searcher<L> {
    pub fn new(lookup: L, corpus_root: PathBuf) -> Self {
        Self { lookup, corpus_root }
    }

    /// Every source reachable by treating `token` as a prefix.
    pub fn fuzzy_search(&self, token: &str) -> Result<HashSet<String>> {
        let normalized = normalize_single(token);
        if normalized.is_empty() {
            return Ok(HashSet::new());
        }
        self.lookup.fuzzy(&normalized)
    }

    /// Combine each word's exact match set: union when `inclusive`,
    /// intersection otherwise.
    pub fn match_words(&self, words: &[String], inclusive: bool) -> Result<HashSet<String>> {
        if words.is_empty() {
            return Ok(HashSet::new());
        }
        let mut sets = Vec::with_capacity(words.len());
        for word in words {
            sets.push(self.lookup.exact(word)?);
        }
        Ok(combine(sets, inclusive))
    }

    /// Sources where `phrase` occurs as a contiguous run of tokens: every
    /// word but the last must match exactly; the last follows `fuzzy`
    /// (prefix match when true, exact when false). Candidates are drawn
    /// from the index, then verified by re-reading the candidate's source
    /// text under `corpus_root`.
    pub fn match_phrase(&self, phrase: &[String], fuzzy: bool) -> Result<HashSet<String>> {
        let Some((last, head)) = phrase.split_last() else {
            return Ok(HashSet::new());
        };

        let mut candidates = if fuzzy { self.lookup.fuzzy(last)? } else { self.lookup.exact(last)? };
        for word in head {
            if candidates.is_empty() {
                return Ok(candidates);
            }
            let exact = self.lookup.exact(word)?;
            candidates.retain(|source| exact.contains(source));
        }
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let mut verified = HashSet::new();
        for source in candidates {
            if self.phrase_occurs_in(&source, phrase, fuzzy)? {
                verified.insert(source);
            }
        }
        Ok(verified)
    }

    fn phrase_occurs_in(&self, source: &str, phrase: &[String], fuzzy: bool) -> Result<bool> {
        let path = self.corpus_root.join(source);
        let bytes = fs::read(&path).map_err(|err| SearchError::UnreadableSource {
            path: path.display().to_string(),
            source: err,
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let words = tokenize_ordered(&text);
        if words.len() < phrase.len() {
            return Ok(false);
        }
        let Some((last, head)) = phrase.split_last() else {
            return Ok(true);
        };
        Ok(words.windows(phrase.len()).any(|window| {
            let (window_last, window_head) = window.split_last().expect("phrase is non-empty");
            let last_matches = if fuzzy { window_last.starts_with(last.as_str()) } else { window_last == last };
            window_head == head && last_matches
        }))
    }
}

fn normalize_single(token: &str) -> String {
    tokenize_ordered(token).into_iter().next().unwrap_or_default()
}

fn combine(sets: Vec<HashSet<String>>, inclusive: bool) -> HashSet<String> {
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return HashSet::new();
    };
    iter.fold(first, |acc, set| {
        if inclusive {
            acc.union(&set).cloned().collect()
        } else {
            acc.intersection(&set).cloned().collect()
        }
    })
}

/// Object-safe query surface so callers can hold either searcher kind
/// behind one handle.
pub trait SearchEngine: Send + Sync {
    fn fuzzy_search(&self, token: &str) -> Result<HashSet<String>>;
    fn match_words(&self, words: &[String], inclusive: bool) -> Result<HashSet<String>>;
    fn match_phrase(&self, phrase: &[String], fuzzy: bool) -> Result<HashSet<String>>;
}

impl<L: Lookup + Send + Sync> SearchEngine for Searcher<L> {
    fn fuzzy_search(&self, token: &str) -> Result<HashSet<String>> {
        Searcher::fuzzy_search(self, token)
    }

    fn match_words(&self, words: &[String], inclusive: bool) -> Result<HashSet<String>> {
        Searcher::match_words(self, words, inclusive)
    }

    fn match_phrase(&self, phrase: &[String], fuzzy: bool) -> Result<HashSet<String>> {
        Searcher::match_phrase(self, phrase, fuzzy)
    }
}

/// Magic-byte prefixes recognized for a compressed or bare tar archive.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const BZIP2_MAGIC: [u8; 3] = *b"BZh";
const XZ_MAGIC: [u8; 6] = [0xFD, b'7', b'z', b'X', b'Z', 0x00];

fn sniff_codec(path: &Path) -> Result<Codec> {
    let mut file = fs::File::open(path)?;
    let mut head = [0u8; 6];
    let n = file.read(&mut head)?;
    let head = &head[..n];

    if head.starts_with(&GZIP_MAGIC) {
        return Ok(Codec::Gzip);
    }
    if head.starts_with(&BZIP2_MAGIC) {
        return Ok(Codec::Bzip2);
    }
    if head == XZ_MAGIC {
        return Ok(Codec::Xz);
    }

    // Bare tar has no magic at offset 0; its "ustar" marker sits at byte
    // 257 of the first header block.
    use std::io::{Seek, SeekFrom};
    let mut header = [0u8; 512];
    file.seek(SeekFrom::Start(0))?;
    if file.read_exact(&mut header).is_ok() && &header[257..262] == b"ustar" {
        return Ok(Codec::None);
    }

    Err(SearchError::MissingIndex { path: path.display().to_string() })
}

/// Open the right [`SearchEngine`] for `index_path`: a directory uses the
/// filesystem resolver, a recognized tar archive (bare or
/// gzip/bzip2/xz-compressed) uses the streaming nested-tar resolver.
/// `corpus_root` is the original corpus, consulted only to verify phrase
/// candidates.
pub fn open_searcher(index_path: &Path, corpus_root: &Path) -> Result<Box<dyn SearchEngine>> {
    if index_path.is_dir() {
        let lookup = FsLookup::new(index_path.to_path_buf());
        return Ok(Box::new(Searcher::new(lookup, corpus_root.to_path_buf())));
    }
    if index_path.is_file() {
        let codec = sniff_codec(index_path)?;
        let lookup = TarLookup::new(index_path.to_path_buf(), codec);
        return Ok(Box::new(Searcher::new(lookup, corpus_root.to_path_buf())));
    }
    Err(SearchError::MissingIndex { path: index_path.display().to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct FakeLookup {
        fuzzy_map: std::collections::HashMap<String, HashSet<String>>,
        exact_map: std::collections::HashMap<String, HashSet<String>>,
    }

    impl Lookup for FakeLookup {
        fn fuzzy(&self, token: &str) -> Result<HashSet<String>> {
            Ok(self.fuzzy_map.get(token).cloned().unwrap_or_default())
        }
        fn exact(&self, token: &str) -> Result<HashSet<String>> {
            Ok(self.exact_map.get(token).cloned().unwrap_or_default())
        }
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_words_union_when_inclusive() {
        let lookup = FakeLookup {
            fuzzy_map: Default::default(),
            exact_map: [("good".to_string(), set(&["a", "b"])), ("bye".to_string(), set(&["b", "c"]))].into(),
        };
        let searcher = Searcher::new(lookup, PathBuf::new());
        let result = searcher.match_words(&["good".to_string(), "bye".to_string()], true).unwrap();
        assert_eq!(result, set(&["a", "b", "c"]));
    }

    #[test]
    fn test_match_words_intersection_when_exclusive() {
        let lookup = FakeLookup {
            fuzzy_map: Default::default(),
            exact_map: [("good".to_string(), set(&["a", "b"])), ("bye".to_string(), set(&["b", "c"]))].into(),
        };
        let searcher = Searcher::new(lookup, PathBuf::new());
        let result = searcher.match_words(&["good".to_string(), "bye".to_string()], false).unwrap();
        assert_eq!(result, set(&["b"]));
    }

    #[test]
    fn test_match_words_does_not_match_on_prefix_only() {
        let lookup = FakeLookup {
            fuzzy_map: [("good".to_string(), set(&["a.txt", "b.txt"]))].into(),
            exact_map: [("good".to_string(), set(&["a.txt"]))].into(),
        };
        let searcher = Searcher::new(lookup, PathBuf::new());
        let result = searcher.match_words(&["good".to_string()], false).unwrap();
        assert_eq!(result, set(&["a.txt"]));
    }

    #[test]
    fn test_match_phrase_verifies_contiguity_against_corpus_text() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "good morning friend").unwrap();
        fs::write(dir.path().join("b.txt"), "morning good friend").unwrap();

        let lookup = FakeLookup {
            fuzzy_map: [("friend".to_string(), set(&["a.txt", "b.txt"]))].into(),
            exact_map: [
                ("good".to_string(), set(&["a.txt", "b.txt"])),
                ("morning".to_string(), set(&["a.txt", "b.txt"])),
            ]
            .into(),
        };
        let searcher = Searcher::new(lookup, dir.path().to_path_buf());
        let result = searcher
            .match_phrase(&["good".to_string(), "morning".to_string(), "friend".to_string()], true)
            .unwrap();
        assert_eq!(result, set(&["a.txt"]));
    }

    #[test]
    fn test_match_phrase_allows_fuzzy_last_word() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "good morning everyone").unwrap();

        let lookup = FakeLookup {
            fuzzy_map: [("eve".to_string(), set(&["a.txt"]))].into(),
            exact_map: [("morning".to_string(), set(&["a.txt"]))].into(),
        };
        let searcher = Searcher::new(lookup, dir.path().to_path_buf());
        let result = searcher.match_phrase(&["morning".to_string(), "eve".to_string()], true).unwrap();
        assert_eq!(result, set(&["a.txt"]));
    }

    #[test]
    fn test_match_phrase_non_fuzzy_rejects_out_of_order_words() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "good morning friend").unwrap();

        let lookup = FakeLookup {
            fuzzy_map: Default::default(),
            exact_map: [
                ("morning".to_string(), set(&["a.txt"])),
                ("good".to_string(), set(&["a.txt"])),
            ]
            .into(),
        };
        let searcher = Searcher::new(lookup, dir.path().to_path_buf());
        let result = searcher.match_phrase(&["morning".to_string(), "good".to_string()], false).unwrap();
        assert_eq!(result, HashSet::new());
    }

    #[test]
    fn test_fuzzy_search_normalizes_and_ignores_blank_query() {
        let lookup = FakeLookup { fuzzy_map: Default::default(), exact_map: Default::default() };
        let searcher = Searcher::new(lookup, PathBuf::new());
        assert!(searcher.fuzzy_search("   ").unwrap().is_empty());
    }
}
