//! PATRICIA-trie path resolution: where a token's node lives, and how to
//! keep path components safe on filesystems with reserved names.
//!
//! `patricia_path` and `safeguard_path` are the only sources of truth for
//! where a token lives in the trie; the builder, mover, and filesystem
//! searcher all route through them.

use std::fs;
use std::path::{Component, Path, PathBuf};

/// Windows device names reserved regardless of extension or case.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL",
    "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8", "COM9",
    "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

fn is_reserved_component(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

/// Rewrite any reserved path component `X` as `X[0]/X[1:]`, repeating until
/// every component is safe. Returns `None` if a component would have to
/// shrink to nothing to become safe (a single-character reserved name has
/// no way to split further).
pub fn safeguard_path(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(os_str) => {
                let mut stem = os_str.to_string_lossy().into_owned();
                loop {
                    if !is_reserved_component(&stem) {
                        result.push(&stem);
                        break;
                    }
                    let mut chars = stem.chars();
                    let first = chars.next()?;
                    let rest: String = chars.collect();
                    if rest.is_empty() {
                        return None;
                    }
                    result.push(first.to_string());
                    stem = rest;
                }
            }
            other => result.push(other.as_os_str()),
        }
    }
    Some(result)
}

/// The longest common prefix of two strings, measured in whole characters.
pub(crate) fn common_prefix(a: &str, b: &str) -> String {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// Name of the directory entry directly under `dir` whose name starts with
/// `first`. By the trie invariant (no two siblings share a non-empty
/// common prefix) there is at most one such entry.
fn find_child_starting_with(dir: &Path, first: char) -> Option<String> {
    let entries = fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.chars().next() == Some(first) {
            return Some(name);
        }
    }
    None
}

/// The three paths relevant to locating `token` within the trie rooted at
/// `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatriciaLocation {
    /// The hypothetical location of `token`'s node, were it inserted now.
    /// `None` only if the path could not be made safe.
    pub target: Option<PathBuf>,
    /// The deepest existing node reached while walking prefix-matching
    /// children. `None` only for an empty token or an empty trie root.
    pub closest: Option<PathBuf>,
    /// A rename needed to split `closest` when it shares only a proper
    /// prefix with `token`.
    pub correction: Option<PathBuf>,
}

impl PatriciaLocation {
    /// True when the trie already has an exact leaf for this token:
    /// `target == closest` and no correction is pending.
    pub fn is_exact(&self) -> bool {
        self.correction.is_none() && self.target.is_some() && self.target == self.closest
    }
}

/// Find the hypothetical path of `token` within the PATRICIA trie at
/// `root`. See module docs and spec §4.2 for the walk algorithm.
pub fn patricia_path(token: &str, root: &Path) -> PatriciaLocation {
    let mut curr = root.to_path_buf();
    let mut remaining = token.to_string();
    let mut target = None;
    let mut closest = None;
    let mut correction = None;

    loop {
        if remaining.is_empty() {
            break;
        }
        let first = remaining.chars().next().expect("non-empty checked above");
        let child = match find_child_starting_with(&curr, first) {
            Some(c) => c,
            None => {
                target = safeguard_path(&curr.join(&remaining));
                closest = Some(curr.clone());
                break;
            }
        };

        let cp = common_prefix(&remaining, &child);
        let next_remaining = if cp == remaining {
            String::new()
        } else {
            remaining[cp.len()..].to_string()
        };

        let cp_path = safeguard_path(Path::new(&cp)).unwrap_or_else(|| PathBuf::from(&cp));
        target = safeguard_path(&curr.join(&cp_path).join(&next_remaining));
        closest = Some(curr.join(&child));

        if cp != child {
            let corrected_tail = &child[cp.len()..];
            correction = safeguard_path(&curr.join(&cp_path).join(corrected_tail));
            break;
        }

        curr = curr.join(&child);
        remaining = next_remaining;
    }

    PatriciaLocation { target, closest, correction }
}

/// True if `closest` — an existing node under `root`, as returned in
/// [`PatriciaLocation::closest`] — spells out a string that starts with
/// `token` once its path components are joined back together. This is
/// the fuzzy/prefix-match test: a node can be `closest` for a query it
/// only partially shares (see `patricia_path`'s correction case), and
/// only the components-concatenate-to-a-prefix check tells those apart
/// from a genuine prefix hit.
pub fn is_prefix_match(token: &str, root: &Path, closest: &Path) -> bool {
    let Ok(relative) = closest.strip_prefix(root) else {
        return false;
    };
    let joined: String = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    joined.starts_with(token)
}

/// Filename a trie leaf directory's postings file is stored under once
/// moved out of staging; the enclosing directory already identifies the
/// token, so this name is the same at every leaf.
pub const LEAF_POSTINGS_FILENAME: &str = "_.ind";

/// The on-disk filename for a token's postings file: a trailing underscore
/// guards against collisions with OS-reserved names (`safeguard_path` only
/// ever sees directory components, not this leaf filename).
pub fn postings_filename(token: &str) -> String {
    format!("{token}_.ind")
}

/// Recover the token a postings filename was written for, or `None` if
/// `name` is not of the `<token>_.ind` form.
pub fn token_from_filename(name: &str) -> Option<&str> {
    name.strip_suffix("_.ind")
}
