//! Filesystem resolver: reads postings directly from a directory-tree
//! trie using `patricia_path`.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::Lookup;
use crate::error::Result;
use crate::path_utils::{is_prefix_match, patricia_path, LEAF_POSTINGS_FILENAME};

pub struct FsLookup {
    root: PathBuf,
}

impl FsLookup {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Lookup for FsLookup {
    fn fuzzy(&self, token: &str) -> Result<HashSet<String>> {
        let location = patricia_path(token, &self.root);
        match &location.closest {
            Some(closest) if is_prefix_match(token, &self.root, closest) => collect_subtree(closest),
            _ => Ok(HashSet::new()),
        }
    }

    fn exact(&self, token: &str) -> Result<HashSet<String>> {
        let location = patricia_path(token, &self.root);
        if location.is_exact() {
            read_leaf(location.closest.as_ref().expect("is_exact implies closest"))
        } else {
            Ok(HashSet::new())
        }
    }
}

fn read_leaf(node: &Path) -> Result<HashSet<String>> {
    match fs::read_to_string(node.join(LEAF_POSTINGS_FILENAME)) {
        Ok(content) => Ok(content.lines().map(String::from).collect()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(err) => Err(err.into()),
    }
}

fn collect_subtree(node: &Path) -> Result<HashSet<String>> {
    let mut out = read_leaf(node)?;
    for entry in fs::read_dir(node)?.flatten() {
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            out.extend(collect_subtree(&entry.path())?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch_leaf(dir: &Path, sources: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(LEAF_POSTINGS_FILENAME), sources.join("\n")).unwrap();
    }

    #[test]
    fn test_exact_returns_only_this_nodes_own_postings() {
        let dir = tempdir().unwrap();
        touch_leaf(&dir.path().join("good"), &["a.txt"]);
        touch_leaf(&dir.path().join("good").join("bye"), &["b.txt"]);

        let lookup = FsLookup::new(dir.path().to_path_buf());
        assert_eq!(lookup.exact("good").unwrap(), ["a.txt".to_string()].into());
    }

    #[test]
    fn test_fuzzy_returns_whole_subtree() {
        let dir = tempdir().unwrap();
        touch_leaf(&dir.path().join("good"), &["a.txt"]);
        touch_leaf(&dir.path().join("good").join("bye"), &["b.txt"]);

        let lookup = FsLookup::new(dir.path().to_path_buf());
        let result = lookup.fuzzy("good").unwrap();
        assert_eq!(result, ["a.txt".to_string(), "b.txt".to_string()].into());
    }

    #[test]
    fn test_fuzzy_matches_singleton_node_by_prefix() {
        let dir = tempdir().unwrap();
        touch_leaf(&dir.path().join("goodbye"), &["a.txt"]);

        let lookup = FsLookup::new(dir.path().to_path_buf());
        assert_eq!(lookup.fuzzy("good").unwrap(), ["a.txt".to_string()].into());
        assert!(lookup.exact("good").unwrap().is_empty());
    }

    #[test]
    fn test_fuzzy_rejects_true_divergence() {
        let dir = tempdir().unwrap();
        touch_leaf(&dir.path().join("good"), &["a.txt"]);

        let lookup = FsLookup::new(dir.path().to_path_buf());
        assert!(lookup.fuzzy("goat").unwrap().is_empty());
    }

    #[test]
    fn test_exact_and_fuzzy_empty_on_missing_token() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        let lookup = FsLookup::new(dir.path().to_path_buf());
        assert!(lookup.fuzzy("nothing").unwrap().is_empty());
        assert!(lookup.exact("nothing").unwrap().is_empty());
    }
}
