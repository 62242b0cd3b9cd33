//! Data sanitization functions for cleaning raw text values.

use once_cell::sync::Lazy;
use regex::Regex;

// Day-of-month ordinals such as "1st" or "22nd"
static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("Invalid regex: ordinal"));

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex: whitespace"));

/// Trim whitespace, then any run of `quote_chars` from both ends, then
/// whitespace again.
///
/// `' "42" '` becomes `42`; inner quotes are kept.
pub(crate) fn strip_quotes<'a>(value: &'a str, quote_chars: &[char]) -> &'a str {
    value
        .trim()
        .trim_matches(|c: char| quote_chars.contains(&c))
        .trim()
}

/// Normalize free-form date text before format matching: strip quotes,
/// collapse inner whitespace and drop ordinal suffixes from day numbers.
pub(crate) fn normalize_date_text(value: &str, quote_chars: &[char]) -> String {
    let stripped = strip_quotes(value, quote_chars);
    let collapsed = WHITESPACE_RUN.replace_all(stripped, " ");
    ORDINAL_SUFFIX.replace_all(&collapsed, "$1").into_owned()
}
