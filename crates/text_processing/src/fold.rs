//! Case and accent folding
//!
//! Comparison keys for choice matching, pattern classification and knowledge
//! lookup: NFKD decomposition, combining marks dropped, lowercased.
//! `"Información"` and `"INFORMACION"` fold to the same key.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Fold text for case- and accent-insensitive comparison
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Folded word tokens (punctuation dropped)
pub fn tokens(text: &str) -> Vec<String> {
    fold(text)
        .unicode_words()
        .map(str::to_string)
        .collect()
}

/// Folded text with whitespace collapsed, for exact comparisons
pub fn fold_key(text: &str) -> String {
    tokens(text).join(" ")
}
