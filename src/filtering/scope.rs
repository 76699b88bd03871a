// Namespace and node placement rules
use ahash::{HashSet, HashSetExt};
use regex::Regex;

use crate::error::{KwildError, Result};
use crate::filtering::options::ScopeSpec;
use crate::patterns::GlobPattern;

/// Exact lists at or above this size are indexed in a hash set
pub const EXACT_INDEX_THRESHOLD: usize = 4;

#[derive(Debug, Clone)]
enum ExactNames {
    Scan(Vec<String>),
    Indexed(HashSet<String>),
}

impl ExactNames {
    fn new(names: &[String]) -> Self {
        if names.len() >= EXACT_INDEX_THRESHOLD {
            let mut set = HashSet::with_capacity(names.len());
            set.extend(names.iter().cloned());
            ExactNames::Indexed(set)
        } else {
            ExactNames::Scan(names.to_vec())
        }
    }

    fn contains(&self, value: &str) -> bool {
        match self {
            ExactNames::Scan(names) => names.iter().any(|n| n == value),
            ExactNames::Indexed(set) => set.contains(value),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ExactNames::Scan(names) => names.is_empty(),
            ExactNames::Indexed(set) => set.is_empty(),
        }
    }
}

/// Compiled exact / prefix / glob / regex rules for one scope (namespace or node)
#[derive(Debug, Clone)]
pub struct ScopeRules {
    exact: ExactNames,
    prefixes: Vec<String>,
    globs: Vec<GlobPattern>,
    regexes: Vec<Regex>,
}

impl ScopeRules {
    /// Compile rules; `context` names the scope in error messages
    pub fn compile(spec: &ScopeSpec, context: &str) -> Result<Self> {
        let regexes = spec
            .regex
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| KwildError::invalid_pattern(format!("{context} regex"), p, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            exact: ExactNames::new(&spec.exact),
            prefixes: spec.prefix.clone(),
            globs: spec.glob.iter().map(|g| GlobPattern::new(g)).collect(),
            regexes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.prefixes.is_empty()
            && self.globs.is_empty()
            && self.regexes.is_empty()
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.exact, ExactNames::Indexed(_))
    }

    /// OR across all rules; no rules allows everything
    pub fn allows(&self, value: &str) -> bool {
        if self.is_empty() {
            return true;
        }
        self.exact.contains(value)
            || self.prefixes.iter().any(|p| value.starts_with(p.as_str()))
            || self.globs.iter().any(|g| g.is_match(value))
            || self.regexes.iter().any(|re| re.is_match(value))
    }
}
