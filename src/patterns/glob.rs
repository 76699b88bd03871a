// Shell-style glob matching against a whole name
//
// `*` matches any run of characters except `/`, `?` matches exactly one
// character except `/`, `[...]` is a character class (`^` negates, `a-z`
// ranges) and `\` escapes the next character. The `/` restriction lets a
// pattern such as `prod-*/web-*` address the "namespace/name" composite
// without a bare `web-*` leaking across the separator.
use globset::{GlobBuilder, GlobMatcher};

/// A glob compiled once and matched against many names.
///
/// A malformed pattern (unterminated class, empty class, trailing escape)
/// compiles to a matcher that never matches.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    matcher: Option<GlobMatcher>,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        if opens_empty_class(pattern) {
            tracing::debug!(pattern, "Glob has an empty character class, it will never match");
            return Self { matcher: None };
        }

        let matcher = match GlobBuilder::new(pattern)
            .literal_separator(true)
            .backslash_escape(true)
            .build()
        {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                tracing::debug!(pattern, error = %e, "Malformed glob, it will never match");
                None
            }
        };
        Self { matcher }
    }

    pub fn is_valid(&self) -> bool {
        self.matcher.is_some()
    }

    /// True when the whole `name` matches
    pub fn is_match(&self, name: &str) -> bool {
        self.matcher.as_ref().is_some_and(|m| m.is_match(name))
    }
}

/// Returns true when `pattern` matches the entire `name`.
///
/// Compiles the pattern on every call; hold a [`GlobPattern`] for repeated use.
pub fn glob_match(pattern: &str, name: &str) -> bool {
    GlobPattern::new(pattern).is_match(name)
}

/// A class whose first member is `]` (`[]a]`, `[^]a]`) is rejected, the
/// way `path.Match` rejects it, instead of reading `]` as a literal.
fn opens_empty_class(pattern: &str) -> bool {
    let p = pattern.as_bytes();
    let mut i = 0;
    while i < p.len() {
        match p[i] {
            b'\\' => i += 2,
            b'[' => {
                i += 1;
                if i < p.len() && (p[i] == b'^' || p[i] == b'!') {
                    i += 1;
                }
                if i < p.len() && p[i] == b']' {
                    return true;
                }
                while i < p.len() && p[i] != b']' {
                    if p[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    false
}
