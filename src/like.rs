//! Wildcard pattern matching
//!
//! A `LIKE`-style matcher independent from the expression tree; the
//! compiler consumes it as a primitive. Supports a multi-character
//! wildcard, a single-character wildcard and bracketed character classes
//! (`[abc]`, `[^abc]`, `[a-z]`). Matching is full-match: subject and
//! pattern must both be consumed.

use serde::{Deserialize, Serialize};

/// Matcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeOptions {
    /// Matches any run of characters, including the empty run
    pub wildcard: char,
    /// Matches exactly one character
    pub single_wildcard: char,
    pub ignore_case: bool,
}

impl Default for LikeOptions {
    fn default() -> Self {
        Self {
            wildcard: '*',
            single_wildcard: '?',
            ignore_case: true,
        }
    }
}

impl LikeOptions {
    /// Default tokens, case-sensitive comparison
    pub fn case_sensitive() -> Self {
        Self {
            ignore_case: false,
            ..Self::default()
        }
    }
}

/// Whether `subject` fully matches `pattern` under the given options.
///
/// Backtracking: the most recent multi-wildcard position is remembered so
/// a failed literal or class match resumes one subject character further
/// after the wildcard instead of failing outright.
pub fn like_match(subject: &str, pattern: &str, options: &LikeOptions) -> bool {
    let (subject, pattern) = if options.ignore_case {
        (subject.to_lowercase(), pattern.to_lowercase())
    } else {
        (subject.to_string(), pattern.to_string())
    };
    let s: Vec<char> = subject.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    let mut si = 0;
    let mut pi = 0;
    // (pattern index after the wildcard, subject index the wildcard is
    // currently absorbing up to)
    let mut star: Option<(usize, usize)> = None;

    while si < s.len() {
        if pi < p.len() && p[pi] == options.wildcard {
            star = Some((pi + 1, si));
            pi += 1;
        } else if let Some(next) = match_single(&p, pi, s[si], options) {
            pi = next;
            si += 1;
        } else if let Some((after_star, absorbed)) = star {
            pi = after_star;
            si = absorbed + 1;
            star = Some((after_star, absorbed + 1));
        } else {
            return false;
        }
    }
    // a tail of multi-wildcards matches the (empty) remaining subject
    while pi < p.len() && p[pi] == options.wildcard {
        pi += 1;
    }
    pi == p.len()
}

/// Match one subject character against the pattern token at `pi`,
/// returning the pattern index after the token on success.
fn match_single(p: &[char], pi: usize, c: char, options: &LikeOptions) -> Option<usize> {
    if pi >= p.len() {
        return None;
    }
    let token = p[pi];
    if token == options.single_wildcard {
        return Some(pi + 1);
    }
    if token == '[' {
        if let Some((matched, next)) = match_class(p, pi, c) {
            return matched.then_some(next);
        }
        // unterminated class falls through to a literal '['
    }
    (token == c).then_some(pi + 1)
}

/// Match `c` against the class opening at `open`. Returns `None` when the
/// class never closes.
fn match_class(p: &[char], open: usize, c: char) -> Option<(bool, usize)> {
    let mut i = open + 1;
    let mut negate = false;
    if p.get(i) == Some(&'^') {
        negate = true;
        i += 1;
    }
    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        let is_range = p.get(i + 1) == Some(&'-') && i + 2 < p.len() && p[i + 2] != ']';
        if is_range {
            if p[i] <= c && c <= p[i + 2] {
                matched = true;
            }
            i += 3;
        } else {
            if p[i] == c {
                matched = true;
            }
            i += 1;
        }
    }
    if i >= p.len() {
        return None;
    }
    Some((matched != negate, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(subject: &str, pattern: &str) -> bool {
        like_match(subject, pattern, &LikeOptions::default())
    }

    #[test]
    fn test_multi_wildcard() {
        assert!(matches("abc", "a*c"));
        assert!(matches("ac", "a*c"));
        assert!(matches("abbbbc", "a*c"));
        assert!(!matches("abd", "a*c"));
    }

    #[test]
    fn test_single_wildcard() {
        assert!(matches("abc", "a?c"));
        assert!(!matches("ac", "a?c"));
        assert!(!matches("abbc", "a?c"));
    }

    #[test]
    fn test_default_is_case_insensitive() {
        assert!(matches("ABC", "a*c"));
        assert!(matches("Patata", "pat*"));
    }

    #[test]
    fn test_case_sensitive_option() {
        assert!(!like_match("ABC", "a*c", &LikeOptions::case_sensitive()));
        assert!(like_match("abc", "a*c", &LikeOptions::case_sensitive()));
    }

    #[test]
    fn test_character_class() {
        assert!(matches("ayz", "[a-c]yz"));
        assert!(!matches("xyz", "[a-c]yz"));
        assert!(matches("byz", "[abc]yz"));
        assert!(!matches("dyz", "[abc]yz"));
    }

    #[test]
    fn test_negated_class() {
        assert!(matches("xyz", "[^a-c]yz"));
        assert!(!matches("ayz", "[^a-c]yz"));
    }

    #[test]
    fn test_full_match_required() {
        assert!(!matches("abcd", "a?c"));
        assert!(!matches("abc", "abcd"));
    }

    #[test]
    fn test_trailing_wildcards_match_empty_tail() {
        assert!(matches("abc", "abc*"));
        assert!(matches("abc", "abc**"));
        assert!(!matches("abc", "abc?"));
    }

    #[test]
    fn test_backtracking() {
        // the first '*' must retreat after greedily absorbing "na"
        assert!(matches("banana", "b*na"));
        assert!(matches("banana", "*nana"));
        assert!(!matches("banana", "b*x"));
    }

    #[test]
    fn test_wildcard_only_pattern() {
        assert!(matches("anything", "*"));
        assert!(matches("", "*"));
        assert!(!matches("", "?"));
    }

    #[test]
    fn test_empty_pattern_matches_only_empty_subject() {
        assert!(matches("", ""));
        assert!(!matches("a", ""));
    }

    #[test]
    fn test_custom_tokens() {
        let options = LikeOptions {
            wildcard: '%',
            single_wildcard: '_',
            ignore_case: true,
        };
        assert!(like_match("abc", "a%", &options));
        assert!(like_match("abc", "a_c", &options));
        // '*' is a plain literal under these options
        assert!(!like_match("abc", "a*", &options));
    }
}
