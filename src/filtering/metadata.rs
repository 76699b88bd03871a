// Label and annotation rules
//
// Filters sharing a key are OR-ed, distinct keys are AND-ed, and a filter on
// a key the resource does not carry always fails.
use ahash::{HashMap, HashMapExt};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{KwildError, Result};
use crate::filtering::options::MetadataSpec;
use crate::patterns::GlobPattern;

/// How a filter pattern is applied to a label or annotation value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueMode {
    Glob,
    Prefix,
    Contains,
    Regex,
}

/// A parsed, compiled `key=pattern` filter
#[derive(Debug, Clone)]
pub struct ValueFilter {
    pub key: String,
    pub pattern: String,
    pub mode: ValueMode,
    matcher: ValueMatcher,
}

#[derive(Debug, Clone)]
enum ValueMatcher {
    Text,
    Glob(GlobPattern),
    Regex(Regex),
}

impl ValueFilter {
    /// Parse `key=pattern`; the key must be non-empty and the pattern may be empty
    pub fn parse(expr: &str, mode: ValueMode, context: &str) -> Result<Self> {
        let (key, pattern) = match expr.split_once('=') {
            Some((key, pattern)) if !key.is_empty() => (key, pattern),
            _ => {
                return Err(KwildError::invalid_syntax(
                    format!("{context} filter"),
                    expr,
                    "expected key=value with a non-empty key",
                ))
            }
        };

        let matcher = match mode {
            ValueMode::Regex => ValueMatcher::Regex(Regex::new(pattern).map_err(|e| {
                KwildError::invalid_pattern(format!("{context} value regex"), pattern, e)
            })?),
            ValueMode::Glob => ValueMatcher::Glob(GlobPattern::new(pattern)),
            ValueMode::Prefix | ValueMode::Contains => ValueMatcher::Text,
        };

        Ok(Self {
            key: key.to_string(),
            pattern: pattern.to_string(),
            mode,
            matcher,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match (&self.matcher, self.mode) {
            (ValueMatcher::Glob(glob), _) => glob.is_match(value),
            (ValueMatcher::Regex(re), _) => re.is_match(value),
            (ValueMatcher::Text, ValueMode::Prefix) => value.starts_with(self.pattern.as_str()),
            (ValueMatcher::Text, _) => value.contains(self.pattern.as_str()),
        }
    }
}

/// Compiled label or annotation rules, grouped by key
#[derive(Debug, Clone, Default)]
pub struct MetadataRules {
    by_key: HashMap<String, Vec<ValueFilter>>,
    key_regexes: Vec<Regex>,
}

impl MetadataRules {
    /// Compile every filter list of `spec`; `context` is "label" or "annotation"
    pub fn compile(spec: &MetadataSpec, context: &str) -> Result<Self> {
        let lists = [
            (&spec.glob, ValueMode::Glob),
            (&spec.prefix, ValueMode::Prefix),
            (&spec.contains, ValueMode::Contains),
            (&spec.regex, ValueMode::Regex),
        ];

        let mut by_key: HashMap<String, Vec<ValueFilter>> = HashMap::new();
        for (exprs, mode) in lists {
            for expr in exprs {
                let filter = ValueFilter::parse(expr, mode, context)?;
                by_key.entry(filter.key.clone()).or_default().push(filter);
            }
        }

        let key_regexes = spec
            .key_regex
            .iter()
            .map(|p| {
                Regex::new(p)
                    .map_err(|e| KwildError::invalid_pattern(format!("{context} key regex"), p, e))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            by_key,
            key_regexes,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty() && self.key_regexes.is_empty()
    }

    /// Number of distinct filtered keys
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    pub fn allows(&self, map: Option<&BTreeMap<String, String>>) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(map) = map else {
            return false;
        };

        let values_ok = self.by_key.iter().all(|(key, filters)| {
            map.get(key)
                .is_some_and(|value| filters.iter().any(|f| f.matches(value)))
        });

        values_ok && self.keys_present(map)
    }

    /// Every key regex must match at least one key; one pass over the keys
    fn keys_present(&self, map: &BTreeMap<String, String>) -> bool {
        let count = self.key_regexes.len();
        match count {
            0 => return true,
            1 => return map.keys().any(|k| self.key_regexes[0].is_match(k)),
            _ if count > u64::BITS as usize => {
                return self
                    .key_regexes
                    .iter()
                    .all(|re| map.keys().any(|k| re.is_match(k)))
            }
            _ => {}
        }

        let all = if count == u64::BITS as usize {
            u64::MAX
        } else {
            (1u64 << count) - 1
        };
        let mut satisfied = 0u64;
        for key in map.keys() {
            for (bit, re) in self.key_regexes.iter().enumerate() {
                let mask = 1u64 << bit;
                if satisfied & mask == 0 && re.is_match(key) {
                    satisfied |= mask;
                }
            }
            if satisfied == all {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn rules(spec: MetadataSpec) -> MetadataRules {
        MetadataRules::compile(&spec, "label").unwrap()
    }

    #[test]
    fn test_same_key_or() {
        let r = rules(MetadataSpec {
            glob: vec!["app=web-*".into(), "app=api-*".into()],
            ..Default::default()
        });
        assert!(r.allows(Some(&labels(&[("app", "web-1")]))));
        assert!(r.allows(Some(&labels(&[("app", "api-1")]))));
        assert!(!r.allows(Some(&labels(&[("app", "db-1")]))));
    }

    #[test]
    fn test_distinct_keys_and() {
        let r = rules(MetadataSpec {
            glob: vec!["app=web-*".into(), "tier=frontend".into()],
            ..Default::default()
        });
        assert!(r.allows(Some(&labels(&[("app", "web-1"), ("tier", "frontend")]))));
        assert!(!r.allows(Some(&labels(&[("app", "web-1"), ("tier", "backend")]))));
    }

    #[test]
    fn test_missing_key_fails() {
        let r = rules(MetadataSpec {
            glob: vec!["app=*".into()],
            ..Default::default()
        });
        assert!(!r.allows(Some(&labels(&[("team", "core")]))));
        assert!(!r.allows(None));
    }

    #[test]
    fn test_no_rules_allow_missing_map() {
        let r = rules(MetadataSpec::default());
        assert!(r.allows(None));
        assert!(r.allows(Some(&BTreeMap::new())));
    }

    #[test]
    fn test_value_modes() {
        let r = rules(MetadataSpec {
            prefix: vec!["env=prod".into()],
            contains: vec!["team=ops".into()],
            regex: vec![r"version=^v\d+$".into()],
            ..Default::default()
        });
        let good = labels(&[("env", "prod-eu"), ("team", "devops"), ("version", "v12")]);
        assert!(r.allows(Some(&good)));

        let bad = labels(&[("env", "prod-eu"), ("team", "devops"), ("version", "v1.2")]);
        assert!(!r.allows(Some(&bad)));
    }

    #[test]
    fn test_mixed_modes_same_key_or() {
        let r = rules(MetadataSpec {
            prefix: vec!["app=web".into()],
            regex: vec!["app=^api-[0-9]+$".into()],
            ..Default::default()
        });
        assert!(r.allows(Some(&labels(&[("app", "webby")]))));
        assert!(r.allows(Some(&labels(&[("app", "api-7")]))));
        assert!(!r.allows(Some(&labels(&[("app", "api-x")]))));
        assert_eq!(r.key_count(), 1);
    }

    #[test]
    fn test_key_presence_regexes() {
        let r = rules(MetadataSpec {
            key_regex: vec!["^app\\.kubernetes\\.io/".into(), "^team$".into()],
            ..Default::default()
        });
        assert!(r.allows(Some(&labels(&[
            ("app.kubernetes.io/name", "web"),
            ("team", "core"),
        ]))));
        assert!(!r.allows(Some(&labels(&[("app.kubernetes.io/name", "web")]))));
        assert!(!r.allows(None));
    }

    #[test]
    fn test_many_key_presence_regexes() {
        let keys: Vec<String> = (0..70).map(|i| format!("k{i}")).collect();
        let all: BTreeMap<String, String> =
            keys.iter().map(|k| (k.clone(), "v".to_string())).collect();
        let mut missing_last = all.clone();
        missing_last.remove("k69");

        for count in [3, 64, 70] {
            let r = rules(MetadataSpec {
                key_regex: keys[..count].iter().map(|k| format!("^{k}$")).collect(),
                ..Default::default()
            });
            assert!(r.allows(Some(&all)), "count={count}");
        }

        let r = rules(MetadataSpec {
            key_regex: keys.iter().map(|k| format!("^{k}$")).collect(),
            ..Default::default()
        });
        assert!(!r.allows(Some(&missing_last)));
    }

    #[test]
    fn test_empty_pattern_value() {
        let r = rules(MetadataSpec {
            glob: vec!["canary=".into()],
            ..Default::default()
        });
        assert!(r.allows(Some(&labels(&[("canary", "")]))));
        assert!(!r.allows(Some(&labels(&[("canary", "true")]))));
    }

    #[test]
    fn test_parse_errors() {
        let missing_sep = MetadataRules::compile(
            &MetadataSpec {
                glob: vec!["app".into()],
                ..Default::default()
            },
            "label",
        )
        .unwrap_err();
        assert!(matches!(missing_sep, KwildError::InvalidFilterSyntax { .. }));

        let empty_key = MetadataRules::compile(
            &MetadataSpec {
                glob: vec!["=web".into()],
                ..Default::default()
            },
            "annotation",
        )
        .unwrap_err();
        assert!(empty_key.to_string().contains("annotation filter"));

        let bad_regex = MetadataRules::compile(
            &MetadataSpec {
                regex: vec!["app=(".into()],
                ..Default::default()
            },
            "label",
        )
        .unwrap_err();
        assert!(matches!(bad_regex, KwildError::InvalidPattern { .. }));
    }
}
