// Filter compilation: validate a FilterSpec once, evaluate it many times
use chrono::{DateTime, Duration, Utc};

use crate::candidate::Candidate;
use crate::error::Result;
use crate::filtering::health::HealthRules;
use crate::filtering::metadata::MetadataRules;
use crate::filtering::options::FilterSpec;
use crate::filtering::scope::ScopeRules;
use crate::filtering::types::FilterStage;
use crate::filtering::utils::parse_duration;
use crate::patterns::{LevenshteinScratch, NameMatcher};

/// Immutable, pre-compiled form of a [`FilterSpec`]
///
/// All regexes are compiled, label and annotation filters are grouped by key
/// and large exact-name lists are indexed. Evaluation never fails and never
/// mutates the filter, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    names: NameMatcher,
    all_namespaces: bool,
    namespaces: ScopeRules,
    nodes: ScopeRules,
    labels: MetadataRules,
    annotations: MetadataRules,
    older_than: Option<Duration>,
    younger_than: Option<Duration>,
    /// `None` when the resource is not pods or no health rule is set
    health: Option<HealthRules>,
    /// Reference time for age filters
    now: DateTime<Utc>,
}

impl CompiledFilter {
    /// Compile against the current wall clock
    pub fn compile(spec: &FilterSpec) -> Result<Self> {
        Self::compile_at(spec, Utc::now())
    }

    /// Compile with an explicit reference time for age filters
    ///
    /// # Errors
    /// * `InvalidPattern` - a regex (name, namespace, node, label or annotation) does not parse
    /// * `InvalidFilterSyntax` - a `key=value` filter, duration or restart expression is malformed
    pub fn compile_at(spec: &FilterSpec, now: DateTime<Utc>) -> Result<Self> {
        let names = NameMatcher::compile(
            spec.match_mode(),
            &spec.includes,
            &spec.excludes,
            spec.ignore_case,
            spec.fuzzy_distance,
        )?;
        let namespaces = ScopeRules::compile(&spec.namespaces, "namespace")?;
        let nodes = ScopeRules::compile(&spec.nodes, "node")?;
        let labels = MetadataRules::compile(&spec.labels, "label")?;
        let annotations = MetadataRules::compile(&spec.annotations, "annotation")?;
        let older_than = spec.older_than.as_deref().map(parse_duration).transpose()?;
        let younger_than = spec
            .younger_than
            .as_deref()
            .map(parse_duration)
            .transpose()?;

        let health_rules = HealthRules::compile(&spec.health)?;
        let health = if health_rules.is_empty() {
            None
        } else if spec.targets_pods() {
            Some(health_rules)
        } else {
            tracing::debug!(
                "Ignoring pod health filters for resource '{}'",
                spec.resource
            );
            None
        };

        tracing::debug!(
            mode = spec.match_mode().as_str(),
            includes = spec.includes.len(),
            excludes = spec.excludes.len(),
            label_keys = labels.key_count(),
            annotation_keys = annotations.key_count(),
            health = health.is_some(),
            "Compiled filter"
        );

        Ok(Self {
            names,
            all_namespaces: spec.all_namespaces,
            namespaces,
            nodes,
            labels,
            annotations,
            older_than,
            younger_than,
            health,
            now,
        })
    }

    /// True when the filter has no constraint at all
    pub fn is_match_all(&self) -> bool {
        self.names.is_match_all()
            && self.namespaces.is_empty()
            && self.nodes.is_empty()
            && self.labels.is_empty()
            && self.annotations.is_empty()
            && self.older_than.is_none()
            && self.younger_than.is_none()
            && self.health.is_none()
    }

    pub fn reference_time(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn namespace_allowed(&self, candidate: &Candidate) -> bool {
        self.namespaces.allows(&candidate.namespace)
    }

    /// Bare name first; the `namespace/name` composite only for all-namespace listings
    pub fn name_matches(&self, scratch: &mut LevenshteinScratch, candidate: &Candidate) -> bool {
        if self.names.matches_with(scratch, &candidate.name) {
            return true;
        }
        self.all_namespaces
            && self
                .names
                .matches_with(scratch, &candidate.qualified_name())
    }

    pub fn labels_allowed(&self, candidate: &Candidate) -> bool {
        self.labels.allows(candidate.labels.as_ref())
    }

    pub fn annotations_allowed(&self, candidate: &Candidate) -> bool {
        self.annotations.allows(candidate.annotations.as_ref())
    }

    /// Older-than and younger-than are independent bounds; an unknown
    /// creation time fails any configured bound
    pub fn age_allowed(&self, candidate: &Candidate) -> bool {
        if self.older_than.is_none() && self.younger_than.is_none() {
            return true;
        }
        let Some(age) = candidate.age_at(self.now) else {
            return false;
        };
        if self.older_than.is_some_and(|min| age < min) {
            return false;
        }
        !self.younger_than.is_some_and(|max| age > max)
    }

    pub fn node_allowed(&self, candidate: &Candidate) -> bool {
        self.nodes.allows(&candidate.node_name)
    }

    pub fn health_allowed(&self, candidate: &Candidate) -> bool {
        self.health.as_ref().map_or(true, |h| h.allows(candidate))
    }

    /// First stage rejecting `candidate`, or `None` when it is accepted
    pub fn rejection(
        &self,
        scratch: &mut LevenshteinScratch,
        candidate: &Candidate,
    ) -> Option<FilterStage> {
        if !self.namespace_allowed(candidate) {
            return Some(FilterStage::Namespace);
        }
        if !self.name_matches(scratch, candidate) {
            return Some(FilterStage::Name);
        }
        if !self.labels_allowed(candidate) {
            return Some(FilterStage::Labels);
        }
        if !self.annotations_allowed(candidate) {
            return Some(FilterStage::Annotations);
        }
        if !self.age_allowed(candidate) {
            return Some(FilterStage::Age);
        }
        if !self.node_allowed(candidate) {
            return Some(FilterStage::Node);
        }
        if !self.health_allowed(candidate) {
            return Some(FilterStage::Health);
        }
        None
    }

    pub fn accepts_with(&self, scratch: &mut LevenshteinScratch, candidate: &Candidate) -> bool {
        self.rejection(scratch, candidate).is_none()
    }

    /// Convenience for one-off checks; allocates fuzzy scratch rows
    pub fn accepts(&self, candidate: &Candidate) -> bool {
        let mut scratch = LevenshteinScratch::new();
        self.accepts_with(&mut scratch, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KwildError;
    use crate::patterns::MatchMode;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_default_spec_is_match_all() {
        let filter = CompiledFilter::compile(&FilterSpec::default()).unwrap();
        assert!(filter.is_match_all());
        assert!(filter.accepts(&Candidate::new("any", "thing")));
    }

    #[test]
    fn test_age_window() {
        let spec = FilterSpec {
            older_than: Some("1h".into()),
            younger_than: Some("3h".into()),
            ..Default::default()
        };
        let filter = CompiledFilter::compile_at(&spec, now()).unwrap();
        let at = |h: i64| Candidate::new("dev", "x").with_created_at(now() - Duration::hours(h));
        assert!(!filter.accepts(&at(0)));
        assert!(filter.accepts(&at(2)));
        assert!(!filter.accepts(&at(5)));
        assert!(!filter.accepts(&Candidate::new("dev", "unknown-age")));
    }

    #[test]
    fn test_all_namespaces_composite_name() {
        let spec = FilterSpec {
            includes: vec!["prod-*/web-*".into()],
            all_namespaces: true,
            ..Default::default()
        };
        let filter = CompiledFilter::compile(&spec).unwrap();
        assert!(filter.accepts(&Candidate::new("prod-eu", "web-1")));
        assert!(!filter.accepts(&Candidate::new("dev", "web-1")));

        let scoped = CompiledFilter::compile(&FilterSpec {
            all_namespaces: false,
            ..spec
        })
        .unwrap();
        assert!(!scoped.accepts(&Candidate::new("prod-eu", "web-1")));
    }

    #[test]
    fn test_health_ignored_for_non_pods() {
        let mut spec = FilterSpec::new("services");
        spec.health.unhealthy = true;
        let filter = CompiledFilter::compile(&spec).unwrap();
        assert!(filter.is_match_all());
        assert!(filter.accepts(&Candidate::new("dev", "svc")));
    }

    #[test]
    fn test_stage_order_reports_first_failure() {
        let mut spec = FilterSpec::default();
        spec.namespaces.exact.push("dev".into());
        spec.includes.push("web-*".into());
        spec.health.unhealthy = true;
        let filter = CompiledFilter::compile(&spec).unwrap();
        let mut scratch = LevenshteinScratch::new();

        let wrong_ns = Candidate::new("prod", "api");
        assert_eq!(
            filter.rejection(&mut scratch, &wrong_ns),
            Some(FilterStage::Namespace)
        );
        let wrong_name = Candidate::new("dev", "api");
        assert_eq!(
            filter.rejection(&mut scratch, &wrong_name),
            Some(FilterStage::Name)
        );
        let healthy = Candidate::new("dev", "web-1").with_phase("Succeeded");
        assert_eq!(
            filter.rejection(&mut scratch, &healthy),
            Some(FilterStage::Health)
        );
    }

    #[test]
    fn test_compile_errors_fail_fast() {
        let bad_regex = FilterSpec {
            mode: Some(MatchMode::Regex),
            includes: vec!["(".into()],
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilter::compile(&bad_regex),
            Err(KwildError::InvalidPattern { .. })
        ));

        let bad_duration = FilterSpec {
            older_than: Some("soon".into()),
            ..Default::default()
        };
        assert!(matches!(
            CompiledFilter::compile(&bad_duration),
            Err(KwildError::InvalidFilterSyntax { .. })
        ));

        let mut bad_label = FilterSpec::default();
        bad_label.labels.glob.push("novalue".into());
        assert!(matches!(
            CompiledFilter::compile(&bad_label),
            Err(KwildError::InvalidFilterSyntax { .. })
        ));
    }

    #[test]
    fn test_node_filter() {
        let mut spec = FilterSpec::default();
        spec.nodes.prefix.push("gpu-".into());
        let filter = CompiledFilter::compile(&spec).unwrap();
        assert!(filter.accepts(&Candidate::new("ml", "train").with_node("gpu-3")));
        assert!(!filter.accepts(&Candidate::new("ml", "train").with_node("cpu-1")));
        assert!(!filter.accepts(&Candidate::new("ml", "pending")));
    }
}
