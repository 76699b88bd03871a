// Raw, user-supplied filter specification
//
// Everything here is plain strings and flags as they arrive from the command
// line or a TOML profile. `CompiledFilter::compile` validates and compiles it.
use crate::patterns::MatchMode;
use serde::{Deserialize, Serialize};

/// Exact / prefix / glob / regex rules for a namespace or node name.
/// A value passes when any rule matches, or when no rule is configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSpec {
    pub exact: Vec<String>,
    pub prefix: Vec<String>,
    pub glob: Vec<String>,
    pub regex: Vec<String>,
}

impl ScopeSpec {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.prefix.is_empty()
            && self.glob.is_empty()
            && self.regex.is_empty()
    }

    fn merge(&mut self, other: &ScopeSpec) {
        self.exact.extend(other.exact.iter().cloned());
        self.prefix.extend(other.prefix.iter().cloned());
        self.glob.extend(other.glob.iter().cloned());
        self.regex.extend(other.regex.iter().cloned());
    }
}

/// Label or annotation filters.
///
/// Each value filter is a `key=pattern` string; the list it sits in decides
/// how the pattern is applied to the value. `key_regex` entries require at
/// least one key matching the regex.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSpec {
    pub glob: Vec<String>,
    pub prefix: Vec<String>,
    pub contains: Vec<String>,
    pub regex: Vec<String>,
    pub key_regex: Vec<String>,
}

impl MetadataSpec {
    pub fn is_empty(&self) -> bool {
        self.glob.is_empty()
            && self.prefix.is_empty()
            && self.contains.is_empty()
            && self.regex.is_empty()
            && self.key_regex.is_empty()
    }

    fn merge(&mut self, other: &MetadataSpec) {
        self.glob.extend(other.glob.iter().cloned());
        self.prefix.extend(other.prefix.iter().cloned());
        self.contains.extend(other.contains.iter().cloned());
        self.regex.extend(other.regex.iter().cloned());
        self.key_regex.extend(other.key_regex.iter().cloned());
    }
}

/// Pod health filters; only applied when the resource kind is pods
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSpec {
    /// Restart comparison: `>N`, `>=N`, `<N`, `<=N`, `=N` or `N`
    pub restarts: Option<String>,
    pub containers_not_ready: bool,
    /// Reasons that must all be present
    pub reasons: Vec<String>,
    /// Restrict `reasons` to one container
    pub container: Option<String>,
    /// Phases or container reasons; any may match
    pub pod_statuses: Vec<String>,
    pub unhealthy: bool,
}

impl HealthSpec {
    pub fn is_empty(&self) -> bool {
        self.restarts.is_none()
            && !self.containers_not_ready
            && self.reasons.is_empty()
            && self.pod_statuses.is_empty()
            && !self.unhealthy
    }

    fn merge(&mut self, other: &HealthSpec) {
        if other.restarts.is_some() {
            self.restarts = other.restarts.clone();
        }
        self.containers_not_ready |= other.containers_not_ready;
        self.reasons.extend(other.reasons.iter().cloned());
        if other.container.is_some() {
            self.container = other.container.clone();
        }
        self.pod_statuses.extend(other.pod_statuses.iter().cloned());
        self.unhealthy |= other.unhealthy;
    }
}

/// Complete filter specification before compilation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    /// Resource kind the candidates belong to
    pub resource: String,
    /// Unset means glob; only a set mode overrides when merged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
    /// Empty means every name passes
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub ignore_case: bool,
    /// Fuzzy mode only; defaults to 1
    pub fuzzy_distance: Option<usize>,
    /// Listing spans namespaces: also try `namespace/name`
    pub all_namespaces: bool,
    pub namespaces: ScopeSpec,
    pub nodes: ScopeSpec,
    pub labels: MetadataSpec,
    pub annotations: MetadataSpec,
    pub older_than: Option<String>,
    pub younger_than: Option<String>,
    pub health: HealthSpec,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            resource: "pods".to_string(),
            mode: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            ignore_case: false,
            fuzzy_distance: None,
            all_namespaces: false,
            namespaces: ScopeSpec::default(),
            nodes: ScopeSpec::default(),
            labels: MetadataSpec::default(),
            annotations: MetadataSpec::default(),
            older_than: None,
            younger_than: None,
            health: HealthSpec::default(),
        }
    }
}

impl FilterSpec {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// Effective match mode
    pub fn match_mode(&self) -> MatchMode {
        self.mode.unwrap_or_default()
    }

    /// Whether the resource kind is pods
    pub fn targets_pods(&self) -> bool {
        matches!(
            self.resource.to_ascii_lowercase().as_str(),
            "pods" | "pod" | "po"
        )
    }

    /// Add an include meaning "starts with `value`" in the active mode
    pub fn add_prefix_include(&mut self, value: &str) {
        let pattern = match self.match_mode() {
            MatchMode::Glob => format!("{value}*"),
            MatchMode::Regex => format!("^{}", regex::escape(value)),
            MatchMode::Contains | MatchMode::Fuzzy => value.to_string(),
        };
        self.includes.push(pattern);
    }

    /// Layer `overlay` on top of this spec.
    ///
    /// Lists are concatenated, flags are OR-ed and scalar options from the
    /// overlay replace ours when set. Used to put command-line flags over a
    /// configured profile.
    pub fn merge(&mut self, overlay: &FilterSpec) {
        if overlay.mode.is_some() {
            self.mode = overlay.mode;
        }
        self.includes.extend(overlay.includes.iter().cloned());
        self.excludes.extend(overlay.excludes.iter().cloned());
        self.ignore_case |= overlay.ignore_case;
        if overlay.fuzzy_distance.is_some() {
            self.fuzzy_distance = overlay.fuzzy_distance;
        }
        self.all_namespaces |= overlay.all_namespaces;
        self.namespaces.merge(&overlay.namespaces);
        self.nodes.merge(&overlay.nodes);
        self.labels.merge(&overlay.labels);
        self.annotations.merge(&overlay.annotations);
        if overlay.older_than.is_some() {
            self.older_than = overlay.older_than.clone();
        }
        if overlay.younger_than.is_some() {
            self.younger_than = overlay.younger_than.clone();
        }
        self.health.merge(&overlay.health);
    }
}
