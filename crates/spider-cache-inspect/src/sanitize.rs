//! Whitelist filter for externally supplied group and key fragments.

/// Whether `c` may appear in a user supplied group or key
#[must_use]
pub const fn is_allowed(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | ':' | '_' | '-')
}

/// Strip every character outside `[a-z0-9:_-]`.
///
/// Nothing is rejected: uppercase letters, punctuation and whitespace are
/// simply dropped, and an empty result is a valid outcome.
///
/// # Example
///
/// ```
/// use spider_cache_inspect::sanitize;
///
/// assert_eq!(sanitize("Group-Name!123"), "roup-ame123");
/// assert_eq!(sanitize("post_meta:42"), "post_meta:42");
/// assert_eq!(sanitize("ÉÈ"), "");
/// ```
#[must_use]
pub fn sanitize(s: &str) -> String {
    s.chars().filter(|&c| is_allowed(c)).collect()
}
