//! Glob patterns
//!
//! Key-space patterns in the dialect the store's KEYS command accepts:
//! `*` (any run), `?` (any one char), `[abc]` / `[a-z]` / `[!a]` classes
//! and `\` escapes.

use globset::{GlobBuilder, GlobMatcher};

use crate::error::{Result, StashError};

/// Escape glob metacharacters so `term` matches only itself
pub fn escape_glob(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Pattern matching `substring` anywhere in a key
pub fn contains_pattern(substring: &str) -> String {
    format!("*{}*", escape_glob(substring))
}

/// Compile a KEYS-style `pattern` for matching against store keys
///
/// `*` also matches `/`, and `\` escapes the next character.
pub fn compile(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(false)
        .backslash_escape(true)
        .build()
        .map_err(|e| StashError::Store(format!("ERR invalid pattern '{}': {}", pattern, e)))?;
    Ok(glob.compile_matcher())
}
