//! Glob matching for pattern deletion.
//!
//! Only `*` is special: it matches any (possibly empty) substring. Every other
//! character matches itself, so keys containing `?` or `[` behave literally.

/// Returns true when `key` matches `pattern`.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let mut segments = pattern.split('*');

    // split always yields at least one segment
    let first = segments.next().unwrap_or_default();
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = segments.collect();
    let Some((last, middle)) = tail.split_last() else {
        // no wildcard at all
        return rest.is_empty();
    };

    for segment in middle {
        match rest.find(segment) {
            Some(idx) => rest = &rest[idx + segment.len()..],
            None => return false,
        }
    }

    rest.len() >= last.len() && rest.ends_with(last)
}

/// `pattern` in Redis `MATCH` syntax with the same meaning as [`glob_match`].
///
/// Redis also treats `?`, `[`, `]` and backslash as special, so those are escaped.
pub(crate) fn redis_match_pattern(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_pattern_keeps_only_star_special() {
        assert_eq!(redis_match_pattern("friends:u1:*"), "friends:u1:*");
        assert_eq!(redis_match_pattern("profile:u?"), "profile:u\\?");
        assert_eq!(redis_match_pattern("tag:[a-z]*"), "tag:\\[a-z\\]*");
        assert_eq!(redis_match_pattern("path:a\\b"), "path:a\\\\b");

        // glob_match sees these characters literally too
        assert!(glob_match("profile:u?", "profile:u?"));
        assert!(!glob_match("profile:u?", "profile:u1"));
        assert!(!glob_match("tag:[a-z]*", "tag:b1"));
    }

    #[test]
    fn test_literal_pattern() {
        assert!(glob_match("friends:u1", "friends:u1"));
        assert!(!glob_match("friends:u1", "friends:u12"));
        assert!(!glob_match("friends:u1", "friends:u"));
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(glob_match("friends:u1*", "friends:u1:page:1"));
        assert!(glob_match("friends:u1*", "friends:u1"));
        assert!(!glob_match("friends:u1*", "other:u2"));
    }

    #[test]
    fn test_leading_and_inner_wildcards() {
        assert!(glob_match("*:page:1", "friends:u1:page:1"));
        assert!(glob_match("friends:*:page:*", "friends:u9:page:12"));
        assert!(!glob_match("friends:*:page:*", "friends:u9:count"));
        assert!(glob_match("*", ""));
        assert!(glob_match("**", "anything"));
    }

    #[test]
    fn test_overlapping_suffix() {
        // the last segment must not reuse characters consumed by a middle one
        assert!(!glob_match("a*ab*ab", "aab"));
        assert!(glob_match("a*ab*ab", "aabab"));
    }
}
