//! Text normalization: splitting corpus text into tokens.
//!
//! A token is a non-empty run of lowercase, printable, non-whitespace
//! characters. Normalization discards characters that are neither
//! whitespace nor printable, maps every ASCII punctuation character to a
//! space, case-folds, then splits on whitespace.

use std::collections::HashSet;

/// Normalize `text` into the ordered sequence of tokens it contains,
/// preserving duplicates and order of appearance. Used wherever order
/// matters, e.g. phrase verification.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text).split_whitespace().map(str::to_string).collect()
}

/// Normalize `text` into the set of unique tokens it contains. Used for
/// indexing and for parsing the token side of a query.
pub fn unique_tokens(text: &str) -> HashSet<String> {
    normalize(text).split_whitespace().map(str::to_string).collect()
}

/// Discard non-printable/non-whitespace characters, blank out ASCII
/// punctuation, and case-fold. Mirrors the original implementation's
/// `as_tokens`: `.isspace() or .isprintable()` filter, then
/// `str.translate` of `string.punctuation` to spaces, then `.casefold()`.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_whitespace() || is_printable(*c))
        .map(|c| if c.is_ascii_punctuation() { ' ' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Approximates Python's `str.isprintable()`: a character is printable if
/// it is not a control character and not otherwise classified as
/// "separator" outside of ordinary ASCII space (which is handled
/// separately by the whitespace branch above).
fn is_printable(c: char) -> bool {
    !c.is_control()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_preserves_order_and_duplicates() {
        assert_eq!(
            tokens("good morning, good friend"),
            vec!["good", "morning", "good", "friend"]
        );
    }

    #[test]
    fn test_unique_tokens_folds_case_and_punctuation() {
        let set = unique_tokens("Good Morning, world!");
        assert_eq!(
            set,
            ["good", "morning", "world"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn test_punctuation_only_yields_no_tokens() {
        assert!(unique_tokens("!!! ... ---").is_empty());
        assert!(tokens("!!! ... ---").is_empty());
    }

    #[test]
    fn test_empty_text() {
        assert!(unique_tokens("").is_empty());
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let s = format!("go{}od", '\u{0007}');
        let set = unique_tokens(&s);
        assert!(set.contains("good"));
    }

    #[test]
    fn test_whitespace_variety_splits_tokens() {
        let set = unique_tokens("good\tmorning\nfriend");
        assert_eq!(set.len(), 3);
    }
}
