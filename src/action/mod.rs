//! Actions over matched resources
//!
//! After filtering, the matched resources are turned into an [`ActionPlan`]:
//! the per-namespace, batched kubectl invocations for the requested verb.
//! Running the plan is left to an [`ActionExecutor`].

use crate::candidate::Candidate;
use crate::error::{KwildError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Default number of names passed to one kubectl invocation
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Label value shown for matches that do not carry the grouping label
pub const NO_LABEL_VALUE: &str = "(none)";

/// Verb applied to the matched resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Describe,
    Delete,
    Top,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "get",
            Verb::Describe => "describe",
            Verb::Delete => "delete",
            Verb::Top => "top",
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Verb::Delete)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = KwildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Verb::Get),
            "describe" => Ok(Verb::Describe),
            "delete" | "del" => Ok(Verb::Delete),
            "top" => Ok(Verb::Top),
            _ => Err(KwildError::invalid_syntax(
                "verb",
                s,
                "expected get, describe, delete or top",
            )),
        }
    }
}

/// A resource that passed the filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRef {
    pub namespace: String,
    pub name: String,
    /// Label copy, kept only when grouping by label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl MatchedRef {
    pub fn from_candidate(candidate: &Candidate, keep_labels: bool) -> Self {
        Self {
            namespace: candidate.namespace.clone(),
            name: candidate.name.clone(),
            labels: if keep_labels {
                candidate.labels.clone()
            } else {
                None
            },
        }
    }

    /// `namespace/name` across namespaces, otherwise the bare name
    pub fn target(&self, all_namespaces: bool) -> String {
        if all_namespaces && !self.namespace.is_empty() {
            format!("{}/{}", self.namespace, self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Count matched refs per value of the `key` label
///
/// Refs without any label map are skipped; refs whose map lacks `key` are
/// counted under [`NO_LABEL_VALUE`].
pub fn label_summary(refs: &[MatchedRef], key: &str) -> BTreeMap<String, usize> {
    let mut groups = BTreeMap::new();
    for labels in refs.iter().filter_map(|r| r.labels.as_ref()) {
        let value = labels
            .get(key)
            .filter(|v| !v.is_empty())
            .map_or(NO_LABEL_VALUE, String::as_str);
        *groups.entry(value.to_string()).or_insert(0) += 1;
    }
    groups
}

/// One kubectl call of a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub verb: Verb,
    pub resource: String,
    /// `None` for cluster-scoped resources
    pub namespace: Option<String>,
    pub names: Vec<String>,
    /// Suppress the table header (every `get` batch after the first)
    pub no_headers: bool,
    /// Extra flags such as `-L key` or `--dry-run=server`
    pub flags: Vec<String>,
}

impl Invocation {
    /// kubectl argument vector, without the `kubectl` program name
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.verb.as_str().to_string(), self.resource.clone()];
        args.extend(self.names.iter().cloned());
        if let Some(ns) = &self.namespace {
            args.push("-n".to_string());
            args.push(ns.clone());
        }
        if self.no_headers {
            args.push("--no-headers=true".to_string());
        }
        args.extend(self.flags.iter().cloned());
        args
    }
}

/// Everything needed to apply one verb to the matched resources
#[derive(Debug, Clone)]
pub struct ActionPlan {
    verb: Verb,
    resource: String,
    refs: Vec<MatchedRef>,
    all_namespaces: bool,
    batch_size: usize,
    flags: Vec<String>,
}

impl ActionPlan {
    /// Create new action plan
    ///
    /// # Arguments
    /// * `verb` - Verb to apply
    /// * `resource` - Resource kind as given on the command line
    /// * `refs` - Matched resources in filter output order
    /// * `all_namespaces` - Whether the listing spanned namespaces
    pub fn new(
        verb: Verb,
        resource: impl Into<String>,
        refs: Vec<MatchedRef>,
        all_namespaces: bool,
    ) -> Self {
        Self {
            verb,
            resource: resource.into(),
            refs,
            all_namespaces,
            batch_size: DEFAULT_BATCH_SIZE,
            flags: Vec::new(),
        }
    }

    /// Names per invocation; 0 puts every name in one invocation
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn refs(&self) -> &[MatchedRef] {
        &self.refs
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Display targets in match order
    pub fn targets(&self) -> Vec<String> {
        self.refs
            .iter()
            .map(|r| r.target(self.all_namespaces))
            .collect()
    }

    /// Names grouped by namespace, match order kept within each namespace
    pub fn by_namespace(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for r in &self.refs {
            groups
                .entry(r.namespace.as_str())
                .or_default()
                .push(r.name.as_str());
        }
        groups
    }

    /// Refuse a destructive plan that matches more than `threshold` resources
    ///
    /// A threshold of 0 disables the guard, as does `assume_yes`.
    pub fn check_confirm_threshold(&self, threshold: usize, assume_yes: bool) -> Result<()> {
        if self.verb.is_destructive() && threshold > 0 && self.len() > threshold && !assume_yes {
            return Err(KwildError::ConfirmThresholdExceeded {
                matched: self.len(),
                threshold,
            });
        }
        Ok(())
    }

    /// One-line preview of a delete, as printed by `--dry-run`
    pub fn dry_run_summary(&self) -> String {
        format!(
            "[dry-run] Would {} {} {}: {}",
            self.verb,
            self.len(),
            self.resource,
            self.targets().join(", ")
        )
    }

    /// Batched invocations, one namespace at a time
    pub fn invocations(&self) -> Vec<Invocation> {
        let mut out = Vec::new();
        for (namespace, names) in self.by_namespace() {
            let batch_size = if self.batch_size == 0 {
                names.len().max(1)
            } else {
                self.batch_size
            };
            for batch in names.chunks(batch_size) {
                out.push(Invocation {
                    verb: self.verb,
                    resource: self.resource.clone(),
                    namespace: (!namespace.is_empty()).then(|| namespace.to_string()),
                    names: batch.iter().map(|n| n.to_string()).collect(),
                    no_headers: self.verb == Verb::Get && !out.is_empty(),
                    flags: self.flags.clone(),
                });
            }
        }
        out
    }

    /// Run every invocation through `executor`, stopping at the first error
    ///
    /// # Returns
    /// Number of invocations executed
    pub fn execute(&self, executor: &mut dyn ActionExecutor) -> Result<usize> {
        let invocations = self.invocations();
        for invocation in &invocations {
            tracing::debug!(
                verb = %invocation.verb,
                namespace = invocation.namespace.as_deref().unwrap_or(""),
                names = invocation.names.len(),
                "Executing batch"
            );
            executor.execute(invocation)?;
        }
        Ok(invocations.len())
    }
}

/// Carries out kubectl invocations
pub trait ActionExecutor {
    fn execute(&mut self, invocation: &Invocation) -> Result<()>;
}

/// Prints each invocation instead of running it
pub struct DryRunExecutor<W: Write> {
    out: W,
    executed: usize,
}

impl<W: Write> DryRunExecutor<W> {
    pub fn new(out: W) -> Self {
        Self { out, executed: 0 }
    }

    pub fn executed(&self) -> usize {
        self.executed
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ActionExecutor for DryRunExecutor<W> {
    fn execute(&mut self, invocation: &Invocation) -> Result<()> {
        writeln!(self.out, "kubectl {}", invocation.args().join(" ")).map_err(|e| {
            KwildError::Io {
                source: e,
                context: "Failed to write dry-run output".to_string(),
            }
        })?;
        self.executed += 1;
        Ok(())
    }
}
