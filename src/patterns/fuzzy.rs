// Bounded edit distance and token-aware fuzzy containment
//
// Generated workload names append replica-set and pod hashes
// (`web-1-7f9c6d8b9c-x2z4q`), so a fuzzy pattern is compared against the
// whole name, every delimiter-separated token, and every cumulative token
// prefix. Arbitrary inner substrings are never compared.

use std::borrow::Cow;

/// Reusable dynamic-programming rows for [`bounded_edit_distance_with`].
///
/// One scratch belongs to one worker; it is grown on demand and never shrinks.
#[derive(Debug, Clone, Default)]
pub struct LevenshteinScratch {
    prev: Vec<usize>,
    curr: Vec<usize>,
}

impl LevenshteinScratch {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            prev: Vec::with_capacity(capacity),
            curr: Vec::with_capacity(capacity),
        }
    }

    fn rows(&mut self, width: usize) -> (&mut [usize], &mut [usize]) {
        if self.prev.len() < width {
            self.prev.resize(width, 0);
            self.curr.resize(width, 0);
        }
        (&mut self.prev[..width], &mut self.curr[..width])
    }
}

/// Levenshtein distance between `a` and `b`, capped at `max_dist + 1`.
///
/// Allocates fresh rows; hot paths should hold a [`LevenshteinScratch`].
pub fn bounded_edit_distance(a: &str, b: &str, max_dist: usize) -> usize {
    let mut scratch = LevenshteinScratch::new();
    bounded_edit_distance_with(&mut scratch, a, b, max_dist)
}

/// Levenshtein distance between `a` and `b` computed over bytes.
///
/// Returns the exact distance when it is `<= max_dist`, otherwise the
/// sentinel `max_dist + 1`. Rows are abandoned as soon as the smallest value
/// in a completed row exceeds `max_dist`.
pub fn bounded_edit_distance_with(
    scratch: &mut LevenshteinScratch,
    a: &str,
    b: &str,
    max_dist: usize,
) -> usize {
    let too_far = max_dist.saturating_add(1);
    if a == b {
        return 0;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.is_empty() {
        return b.len().min(too_far);
    }
    if b.is_empty() {
        return a.len().min(too_far);
    }
    if a.len().abs_diff(b.len()) > max_dist {
        return too_far;
    }

    let (mut prev, mut curr) = scratch.rows(b.len() + 1);
    for (j, cell) in prev.iter_mut().enumerate() {
        *cell = j;
    }

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for j in 1..=b.len() {
            let cost = usize::from(ca != b[j - 1]);
            let value = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = value;
            row_min = row_min.min(value);
        }
        if row_min > max_dist {
            return too_far;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()].min(too_far)
}

/// Token delimiters in generated resource names
fn is_delimiter(b: u8) -> bool {
    matches!(b, b'-' | b'_' | b'.')
}

/// Fuzzy containment of `pattern` in `target` within `max_dist` edits.
pub fn fuzzy_contains(target: &str, pattern: &str, max_dist: usize, ignore_case: bool) -> bool {
    let mut scratch = LevenshteinScratch::new();
    fuzzy_contains_with(&mut scratch, target, pattern, max_dist, ignore_case)
}

/// [`fuzzy_contains`] with caller-owned scratch rows.
///
/// Compares the full target, then for each token (split on `-`, `_`, `.`)
/// the cumulative prefix ending at that token and the token itself.
pub fn fuzzy_contains_with(
    scratch: &mut LevenshteinScratch,
    target: &str,
    pattern: &str,
    max_dist: usize,
    ignore_case: bool,
) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if target.is_empty() {
        return false;
    }

    let (t, p): (Cow<'_, str>, Cow<'_, str>) = if ignore_case {
        (lowercase(target), lowercase(pattern))
    } else {
        (Cow::Borrowed(target), Cow::Borrowed(pattern))
    };
    let t = t.as_ref();
    let p = p.as_ref();

    if bounded_edit_distance_with(scratch, t, p, max_dist) <= max_dist {
        return true;
    }

    let bytes = t.as_bytes();
    let mut token_start = 0;
    for i in 0..=bytes.len() {
        let at_boundary = i == bytes.len() || is_delimiter(bytes[i]);
        if !at_boundary {
            continue;
        }
        if i > token_start {
            let cumulative = &t[..i];
            if bounded_edit_distance_with(scratch, cumulative, p, max_dist) <= max_dist {
                return true;
            }
            let token = &t[token_start..i];
            if bounded_edit_distance_with(scratch, token, p, max_dist) <= max_dist {
                return true;
            }
        }
        token_start = i + 1;
    }

    false
}

/// Lower-case without allocating when the input has no upper-case ASCII.
/// Resource names are normally lower-case already.
pub(crate) fn lowercase(s: &str) -> Cow<'_, str> {
    if s.bytes().any(|b| b.is_ascii_uppercase()) || !s.is_ascii() {
        Cow::Owned(s.to_lowercase())
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levenshtein(a: &str, b: &str) -> usize {
        let a = a.as_bytes();
        let b = b.as_bytes();
        let mut dp = vec![vec![0usize; b.len() + 1]; a.len() + 1];
        for (i, row) in dp.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=b.len() {
            dp[0][j] = j;
        }
        for i in 1..=a.len() {
            for j in 1..=b.len() {
                let cost = usize::from(a[i - 1] != b[j - 1]);
                dp[i][j] = (dp[i - 1][j] + 1)
                    .min(dp[i][j - 1] + 1)
                    .min(dp[i - 1][j - 1] + cost);
            }
        }
        dp[a.len()][b.len()]
    }

    #[test]
    fn test_bounded_matches_full_distance() {
        let words = [
            "", "a", "nginx", "ngin", "api-1", "apu-1", "kitten", "sitting", "flaw", "lawn",
            "pending-forever", "web-1-7f9c6d8b9c-x2z4q",
        ];
        let mut scratch = LevenshteinScratch::new();
        for a in words {
            for b in words {
                for max in 0..4 {
                    assert_eq!(
                        bounded_edit_distance_with(&mut scratch, a, b, max),
                        levenshtein(a, b).min(max + 1),
                        "a={a:?} b={b:?} max={max}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_bounded_length_gap_short_circuits() {
        assert_eq!(bounded_edit_distance("a", "abcdef", 2), 3);
        assert_eq!(bounded_edit_distance("", "abcdef", 2), 3);
    }

    #[test]
    fn test_unbounded_max_distance_does_not_overflow() {
        assert_eq!(bounded_edit_distance("abc", "abd", usize::MAX), 1);
        assert_eq!(bounded_edit_distance("", "abc", usize::MAX), 3);
        assert!(fuzzy_contains("abd", "abc", usize::MAX, false));
    }

    #[test]
    fn test_kitten_sitting() {
        assert_eq!(bounded_edit_distance("kitten", "sitting", 3), 3);
        assert_eq!(bounded_edit_distance("kitten", "sitting", 2), 3);
        assert_eq!(bounded_edit_distance("kitten", "sitting", 1), 2);
    }

    #[test]
    fn test_fuzzy_cumulative_prefix() {
        assert!(fuzzy_contains("api-1-abc123", "apu-1", 1, false));
    }

    #[test]
    fn test_fuzzy_no_inner_substring_overmatch() {
        assert!(!fuzzy_contains("pending-forever", "ngin", 1, false));
    }

    #[test]
    fn test_fuzzy_full_string() {
        assert!(fuzzy_contains("nginx", "ngin", 1, false));
        assert!(!fuzzy_contains("nginx", "ng", 1, false));
    }

    #[test]
    fn test_fuzzy_token_match() {
        assert!(fuzzy_contains("web-1-7f9c6d8b9c-x2z4q", "x2z4p", 1, false));
        assert!(fuzzy_contains("my_service.prod", "prud", 1, false));
    }

    #[test]
    fn test_fuzzy_hashed_pod_name() {
        assert!(fuzzy_contains("web-1-7f9c6d8b9c-x2z4q", "wep-1", 1, false));
        assert!(!fuzzy_contains("db-0", "wep-1", 1, false));
    }

    #[test]
    fn test_fuzzy_empty_inputs() {
        assert!(fuzzy_contains("anything", "", 1, false));
        assert!(fuzzy_contains("", "", 1, false));
        assert!(!fuzzy_contains("", "a", 1, false));
    }

    #[test]
    fn test_fuzzy_ignore_case() {
        assert!(!fuzzy_contains("API-1-abc", "apu-1", 1, false));
        assert!(fuzzy_contains("API-1-abc", "apu-1", 1, true));
    }

    #[test]
    fn test_fuzzy_larger_distance() {
        assert!(!fuzzy_contains("api-1-abc", "apx-9", 1, false));
        assert!(fuzzy_contains("api-1-abc", "apx-9", 2, false));
    }

    #[test]
    fn test_lowercase_borrows_when_clean() {
        assert!(matches!(lowercase("web-1"), Cow::Borrowed(_)));
        assert!(matches!(lowercase("Web-1"), Cow::Owned(_)));
    }
}
