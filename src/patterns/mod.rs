//! Name pattern matching for resource selection
//!
//! This module provides:
//! - Shell-style glob matching (`glob`)
//! - Bounded edit distance and token-aware fuzzy matching (`fuzzy`)
//! - Pre-compiled include/exclude pattern lists (`NameMatcher`)

mod fuzzy;
mod glob;

pub use fuzzy::{
    bounded_edit_distance, bounded_edit_distance_with, fuzzy_contains, fuzzy_contains_with,
    LevenshteinScratch,
};
pub use glob::{glob_match, GlobPattern};

pub(crate) use fuzzy::lowercase;

use crate::error::{KwildError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// How name patterns are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Shell glob against the whole name
    #[default]
    Glob,
    /// Unanchored regular expression search
    Regex,
    /// Plain substring
    Contains,
    /// Bounded edit distance against the name, its tokens and token prefixes
    Fuzzy,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Glob => "glob",
            MatchMode::Regex => "regex",
            MatchMode::Contains => "contains",
            MatchMode::Fuzzy => "fuzzy",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = KwildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "glob" => Ok(MatchMode::Glob),
            "regex" => Ok(MatchMode::Regex),
            "contains" => Ok(MatchMode::Contains),
            "fuzzy" => Ok(MatchMode::Fuzzy),
            other => Err(KwildError::invalid_syntax(
                "match mode",
                other,
                "expected one of glob, regex, contains, fuzzy",
            )),
        }
    }
}

/// Default edit distance for fuzzy mode
pub const DEFAULT_FUZZY_DISTANCE: usize = 1;

/// Largest accepted fuzzy edit distance
pub const MAX_FUZZY_DISTANCE: usize = 10;

/// A single compiled name pattern.
/// Glob, contains and fuzzy text is already lower-cased when matching ignores case.
#[derive(Debug, Clone)]
enum CompiledPattern {
    Glob(GlobPattern),
    Regex(Regex),
    Contains(String),
    Fuzzy(String),
}

impl CompiledPattern {
    fn compile(mode: MatchMode, pattern: &str, ignore_case: bool, context: &str) -> Result<Self> {
        let text = || {
            if ignore_case {
                pattern.to_lowercase()
            } else {
                pattern.to_string()
            }
        };

        Ok(match mode {
            MatchMode::Glob => CompiledPattern::Glob(GlobPattern::new(&text())),
            MatchMode::Contains => CompiledPattern::Contains(text()),
            MatchMode::Fuzzy => CompiledPattern::Fuzzy(text()),
            MatchMode::Regex => {
                // Inline flag keeps character classes intact
                let source = if ignore_case {
                    format!("(?i){pattern}")
                } else {
                    pattern.to_string()
                };
                let regex = Regex::new(&source)
                    .map_err(|e| KwildError::invalid_pattern(context, pattern, e))?;
                CompiledPattern::Regex(regex)
            }
        })
    }

    fn matches(&self, scratch: &mut LevenshteinScratch, name: &str, max_dist: usize) -> bool {
        match self {
            CompiledPattern::Glob(p) => p.is_match(name),
            CompiledPattern::Regex(re) => re.is_match(name),
            CompiledPattern::Contains(p) => name.contains(p.as_str()),
            CompiledPattern::Fuzzy(p) => fuzzy_contains_with(scratch, name, p, max_dist, false),
        }
    }
}

/// Pre-compiled include/exclude name patterns
#[derive(Debug, Clone)]
pub struct NameMatcher {
    mode: MatchMode,
    ignore_case: bool,
    fuzzy_max_distance: usize,
    includes: Vec<CompiledPattern>,
    excludes: Vec<CompiledPattern>,
}

impl NameMatcher {
    /// Compile include and exclude lists for `mode`.
    ///
    /// # Arguments
    /// * `fuzzy_max_distance` - only used in fuzzy mode; `None` or `0` means 1
    ///
    /// # Errors
    /// `InvalidPattern` when a regex fails to parse, `InvalidFilterSyntax`
    /// when the fuzzy distance is above [`MAX_FUZZY_DISTANCE`]
    pub fn compile(
        mode: MatchMode,
        includes: &[String],
        excludes: &[String],
        ignore_case: bool,
        fuzzy_max_distance: Option<usize>,
    ) -> Result<Self> {
        let fuzzy_max_distance = match fuzzy_max_distance {
            Some(d) if d > MAX_FUZZY_DISTANCE => {
                return Err(KwildError::invalid_syntax(
                    "fuzzy distance",
                    d.to_string(),
                    format!("must be at most {MAX_FUZZY_DISTANCE}"),
                ))
            }
            Some(d) if d > 0 => d,
            _ => DEFAULT_FUZZY_DISTANCE,
        };

        let includes = includes
            .iter()
            .map(|p| CompiledPattern::compile(mode, p, ignore_case, "include"))
            .collect::<Result<Vec<_>>>()?;
        let excludes = excludes
            .iter()
            .map(|p| CompiledPattern::compile(mode, p, ignore_case, "exclude"))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            mode,
            ignore_case,
            fuzzy_max_distance,
            includes,
            excludes,
        })
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn fuzzy_max_distance(&self) -> usize {
        self.fuzzy_max_distance
    }

    /// True when no include or exclude pattern is configured
    pub fn is_match_all(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty()
    }

    /// Check a name, allocating fresh fuzzy scratch rows
    pub fn matches(&self, name: &str) -> bool {
        let mut scratch = LevenshteinScratch::new();
        self.matches_with(&mut scratch, name)
    }

    /// Check a name: any include (or no includes) and no exclude
    pub fn matches_with(&self, scratch: &mut LevenshteinScratch, name: &str) -> bool {
        if self.is_match_all() {
            return true;
        }

        let name: Cow<'_, str> = if self.ignore_case && self.mode != MatchMode::Regex {
            lowercase(name)
        } else {
            Cow::Borrowed(name)
        };
        let dist = self.fuzzy_max_distance;

        let included = self.includes.is_empty()
            || self
                .includes
                .iter()
                .any(|p| p.matches(scratch, &name, dist));
        if !included {
            return false;
        }

        !self
            .excludes
            .iter()
            .any(|p| p.matches(scratch, &name, dist))
    }
}
