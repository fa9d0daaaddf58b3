//! Trie builder: fold the corpus's token universe into a PATRICIA-trie
//! directory tree by recursive common-prefix split.
//!
//! Tokens are grouped by first character, the group's common prefix
//! becomes a directory, and the group recurses on the stripped
//! remainders. Two groups keyed on different first characters can never
//! share a prefix, so the top-level groups are dispatched across the
//! worker pool; everything below that runs on the calling thread to avoid
//! a pool worker blocking on a sub-task submitted to its own pool.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SearchError};
use crate::path_utils::{common_prefix, safeguard_path};
use crate::pool::{Pool, WorkerPool};

fn safeguard_join(dir: &Path, component: &str) -> Result<PathBuf> {
    safeguard_path(&dir.join(component))
        .ok_or_else(|| SearchError::UnsafePath { token: component.to_string() })
}

fn common_prefix_all(words: &[String]) -> String {
    let mut prefix = words[0].clone();
    for word in &words[1..] {
        prefix = common_prefix(&prefix, word);
        if prefix.is_empty() {
            break;
        }
    }
    prefix
}

fn group_by_first_char(words: Vec<String>) -> HashMap<char, Vec<String>> {
    let mut groups: HashMap<char, Vec<String>> = HashMap::new();
    for word in words {
        let first = word.chars().next().expect("empty tokens are filtered before grouping");
        groups.entry(first).or_default().push(word);
    }
    groups
}

/// Build (or create the one missing leaf of) a single first-character
/// group under `dir`, counting successful leaves into `leaves`.
fn build_group(group: Vec<String>, dir: &Path, leaves: &mut usize) {
    if group.len() == 1 {
        match safeguard_join(dir, &group[0]) {
            Ok(leaf) => match fs::create_dir_all(&leaf) {
                Ok(()) => *leaves += 1,
                Err(err) => tracing::warn!(token = %group[0], error = %err, "failed to create trie leaf"),
            },
            Err(err) => tracing::warn!(token = %group[0], error = %err, "skipping unsafe token"),
        }
        return;
    }

    let prefix = common_prefix_all(&group);
    let prefix_dir = match safeguard_join(dir, &prefix) {
        Ok(p) => p,
        Err(err) => {
            tracing::warn!(prefix = %prefix, error = %err, "skipping unsafe prefix group");
            return;
        }
    };
    if let Err(err) = fs::create_dir_all(&prefix_dir) {
        tracing::warn!(path = %prefix_dir.display(), error = %err, "failed to create trie node");
        return;
    }

    let remainders: Vec<String> = group.into_iter().map(|w| w[prefix.len()..].to_string()).collect();
    let terminal_count = remainders.iter().filter(|r| r.is_empty()).count();
    *leaves += terminal_count;

    let descendants: Vec<String> = remainders.into_iter().filter(|r| !r.is_empty()).collect();
    build_subtree(descendants, &prefix_dir, leaves);
}

fn build_subtree(words: Vec<String>, dir: &Path, leaves: &mut usize) {
    if words.is_empty() {
        return;
    }
    for (_, group) in group_by_first_char(words) {
        build_group(group, dir, leaves);
    }
}

/// Build the trie for every token in `tokens` under `root`, using `pool`
/// to dispatch the (disjoint) top-level first-character groups. Returns
/// the number of leaves successfully created.
pub fn build_trie(tokens: impl IntoIterator<Item = String>, root: &Path, pool: &WorkerPool) -> Result<usize> {
    fs::create_dir_all(root)?;
    let words: Vec<String> = tokens.into_iter().filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Ok(0);
    }

    let groups: Vec<(char, Vec<String>)> = group_by_first_char(words).into_iter().collect();
    let root = root.to_path_buf();
    let counts = pool.map(groups, move |(_, group)| {
        let mut leaves = 0usize;
        build_group(group, &root, &mut leaves);
        leaves
    })?;
    Ok(counts.into_iter().sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_utils::patricia_path;
    use tempfile::tempdir;

    #[test]
    fn test_build_trie_creates_exact_leaf_for_every_token() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let tokens = ["good", "goodbye", "morning", "evening"].map(String::from);
        let leaves = build_trie(tokens, dir.path(), &pool).unwrap();
        assert_eq!(leaves, 4);

        for token in ["good", "goodbye", "morning", "evening"] {
            let loc = patricia_path(token, dir.path());
            assert!(loc.is_exact(), "expected exact leaf for {token}, got {loc:?}");
        }
    }

    #[test]
    fn test_build_trie_handles_prefix_that_is_itself_a_token() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let tokens = ["good", "goodbye"].map(String::from);
        let leaves = build_trie(tokens, dir.path(), &pool).unwrap();
        assert_eq!(leaves, 2);
        assert!(patricia_path("good", dir.path()).is_exact());
        assert!(patricia_path("goodbye", dir.path()).is_exact());
    }

    #[test]
    fn test_build_trie_on_single_token() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let leaves = build_trie(["solo".to_string()], dir.path(), &pool).unwrap();
        assert_eq!(leaves, 1);
        assert!(patricia_path("solo", dir.path()).is_exact());
    }

    #[test]
    fn test_build_trie_on_empty_universe() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        let leaves = build_trie(std::iter::empty(), dir.path(), &pool).unwrap();
        assert_eq!(leaves, 0);
    }

    #[test]
    fn test_build_trie_skips_unsafe_token_but_keeps_others() {
        let dir = tempdir().unwrap();
        let pool = WorkerPool::for_cpu_bound_work();
        // "con" alone is a reserved Windows name but splits safely into
        // "c"/"on"; this just exercises that the happy path still runs
        // alongside a normal token sharing its first letter.
        let tokens = ["con", "cooking"].map(String::from);
        let leaves = build_trie(tokens, dir.path(), &pool).unwrap();
        assert_eq!(leaves, 2);
    }
}
