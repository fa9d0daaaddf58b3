//! Postings mover: relocate staged `<token>_.ind` files into the trie
//! leaf `patricia_path` computes for each token, applying the directory
//! split `patricia_path` reports as a correction first.
//!
//! By the time this runs, `build_trie` has already created an exact node
//! for every token in the corpus's universe, so a correction should not
//! normally be needed here — this still implements it so the mover is
//! correct on its own, independent of whatever built the tree it's
//! walking.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::path_utils::{patricia_path, token_from_filename, LEAF_POSTINGS_FILENAME};
use crate::pool::{IoPool, Pool};

/// Remove `dir` and walk upward removing any now-empty ancestor, stopping
/// at `stop` (exclusive) or the first non-empty directory.
fn prune_empty_ancestors(dir: &Path, stop: &Path) {
    let mut current = dir.to_path_buf();
    while current != stop {
        match fs::read_dir(&current) {
            Ok(mut entries) if entries.next().is_none() => {
                if fs::remove_dir(&current).is_err() {
                    break;
                }
            }
            _ => break,
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => break,
        }
    }
}

/// Move one staged file to its trie leaf, splitting the existing node
/// first if `patricia_path` reports a correction.
fn move_one(staged_file: &Path, token: &str, index_root: &Path) -> Result<()> {
    let location = patricia_path(token, index_root);

    if let Some(correction) = &location.correction {
        let prefix_dir = correction.parent().expect("a correction path always has a parent");
        fs::create_dir_all(prefix_dir)?;
        if let Some(closest) = &location.closest {
            if closest != correction {
                fs::rename(closest, correction)?;
                prune_empty_ancestors(
                    closest.parent().unwrap_or(index_root),
                    index_root,
                )
            }
        }
    }

    let target = location.target.ok_or_else(|| crate::error::SearchError::UnsafePath {
        token: token.to_string(),
    })?;
    fs::create_dir_all(&target)?;
    fs::rename(staged_file, target.join(LEAF_POSTINGS_FILENAME))?;
    Ok(())
}

/// Move every `<token>_.ind` file under `staging_dir` into the trie at
/// `index_root`, fanned out over `pool`. Returns the number of files
/// successfully moved; a failure on one file is logged and does not stop
/// the others.
pub fn move_all_postings(staging_dir: &Path, index_root: &Path, pool: &IoPool) -> Result<usize> {
    let staged: Vec<(std::path::PathBuf, String)> = fs::read_dir(staging_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = entry.file_name();
            let token = token_from_filename(name.to_str()?)?.to_string();
            Some((path, token))
        })
        .collect();

    let index_root = index_root.to_path_buf();
    let results = pool.map(staged, move |(path, token)| move_one(&path, &token, &index_root))?;

    let mut moved = 0usize;
    for result in results {
        match result {
            Ok(()) => moved += 1,
            Err(err) => tracing::warn!(error = %err, "failed to move a postings file into the trie"),
        }
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_utils::postings_filename;
    use tempfile::tempdir;

    #[test]
    fn test_move_places_file_at_exact_existing_leaf() {
        let staging = tempdir().unwrap();
        let index = tempdir().unwrap();
        fs::create_dir_all(index.path().join("good")).unwrap();
        fs::write(staging.path().join(postings_filename("good")), "a.txt\n").unwrap();

        let pool = IoPool::for_io_fanout();
        let moved = move_all_postings(staging.path(), index.path(), &pool).unwrap();
        assert_eq!(moved, 1);

        let content = fs::read_to_string(index.path().join("good").join(LEAF_POSTINGS_FILENAME)).unwrap();
        assert_eq!(content, "a.txt\n");
    }

    #[test]
    fn test_move_applies_correction_split() {
        let staging = tempdir().unwrap();
        let index = tempdir().unwrap();
        // Simulate a trie that only knows about "goodbye"; moving "good"
        // in must split it into good/bye.
        fs::create_dir_all(index.path().join("goodbye")).unwrap();
        fs::write(staging.path().join(postings_filename("good")), "a.txt\n").unwrap();

        let pool = IoPool::for_io_fanout();
        let moved = move_all_postings(staging.path(), index.path(), &pool).unwrap();
        assert_eq!(moved, 1);

        assert!(index.path().join("good").join(LEAF_POSTINGS_FILENAME).exists());
        assert!(index.path().join("good").join("bye").exists());
        assert!(!index.path().join("goodbye").exists());
    }

    #[test]
    fn test_move_handles_empty_staging_dir() {
        let staging = tempdir().unwrap();
        let index = tempdir().unwrap();
        let pool = IoPool::for_io_fanout();
        let moved = move_all_postings(staging.path(), index.path(), &pool).unwrap();
        assert_eq!(moved, 0);
    }
}
