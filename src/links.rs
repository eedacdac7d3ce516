//! Links.
//!
//! This module contains the (permissive) extraction of links from HTML pages.

use regex::Regex;
use std::sync::LazyLock;

// Matches the value of an `href` attribute (single-quoted, double-quoted or unquoted).
#[doc(hidden)]
static HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"href=['"]?([^'" >]+)"#).unwrap());

/// Returns the values of all `href` attributes in order of appearance.
///
/// No HTML parser is involved, so malformed markup may produce false positives.
pub(crate) fn find_urls(html: &str) -> Vec<&str> {
    HREF.captures_iter(html) //
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect()
}
