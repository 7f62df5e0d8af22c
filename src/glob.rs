//! Wildcard matching for symbol names.
//!
//! `?` matches exactly one character and `*` any run of characters,
//! including none. The whole name must match. Matching backtracks over every
//! split a `*` allows, which is exponential for adversarial patterns with
//! many stars; symbol names are short so this is not a concern in practice.

/// True if the pattern contains a wildcard character.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// Matches `text` against `pattern`, anchored at both ends.
///
/// # Examples
///
/// ```
/// use loglang::glob::glob_match;
///
/// assert!(glob_match("cpu.0", "cpu.*"));
/// assert!(glob_match("abc", "a?c"));
/// assert!(!glob_match("abc", "a?"));
/// ```
pub fn glob_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    match_from(&text, &pattern)
}

fn match_from(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some(('*', rest)) => {
            // Try consuming zero characters first, then one more at a time.
            (0..=text.len()).any(|skip| match_from(&text[skip..], rest))
        }
        Some(('?', rest)) => !text.is_empty() && match_from(&text[1..], rest),
        Some((ch, rest)) => text.first() == Some(ch) && match_from(&text[1..], rest),
    }
}

#[test]
fn test_literal_and_wildcards() {
    assert!(glob_match("abc", "abc"));
    assert!(!glob_match("abc", "abd"));
    assert!(glob_match("abc", "a*c"));
    assert!(glob_match("abc", "a?c"));
    assert!(!glob_match("abc", "a?"));
    assert!(!glob_match("abc", "ab"));
    assert!(!glob_match("ab", "abc"));
}

#[test]
fn test_star_edges() {
    assert!(glob_match("", "*"));
    assert!(glob_match("", "**"));
    assert!(!glob_match("", "?"));
    assert!(glob_match("cpu.", "cpu.*"));
    assert!(glob_match("cpu.12", "cpu.*"));
    assert!(!glob_match("mem.12", "cpu.*"));
    assert!(glob_match("a.b.c", "*.c"));
    assert!(glob_match("abcbc", "a*bc"));
    assert!(!glob_match("abcbd", "a*bc"));
}

#[test]
fn test_is_glob() {
    assert!(is_glob("cpu.*"));
    assert!(is_glob("disk?"));
    assert!(!is_glob("cpu.0"));
}
