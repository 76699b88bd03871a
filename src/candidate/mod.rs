//! Candidate resource snapshots
//!
//! A candidate is the metadata of one discovered resource. Discovery builds
//! them once per listing and filtering only ever reads them.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical pod phases
pub const POD_PHASES: [&str; 5] = ["Pending", "Running", "Succeeded", "Failed", "Unknown"];

/// Reason surfaced for a container in the running state
pub const RUNNING_REASON: &str = "Running";

/// One discovered resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Candidate {
    /// Namespace (empty for cluster-scoped resources)
    pub namespace: String,

    /// Resource name
    pub name: String,

    /// Creation timestamp, `None` when unknown
    pub created_at: Option<DateTime<Utc>>,

    /// Labels; `None` when the resource carries no label map at all
    pub labels: Option<BTreeMap<String, String>>,

    /// Annotations; same shape as labels
    pub annotations: Option<BTreeMap<String, String>>,

    /// Node the pod is scheduled on
    pub node_name: String,

    /// Pod phase, empty for non-pods
    pub pod_phase: String,

    /// Phase plus every container reason, in observation order
    pub pod_reasons: Vec<String>,

    /// Container name -> reasons observed for that container
    pub reasons_by_container: BTreeMap<String, Vec<String>>,

    /// Sum of container restart counts
    pub total_restarts: u32,

    /// Containers that are not ready
    pub not_ready_containers: u32,

    /// Owner references as `Kind/Name`
    pub owners: Vec<String>,
}

impl Candidate {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node_name = node.into();
        self
    }

    /// Set the phase; it is also recorded as the first pod reason
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        let phase = phase.into();
        self.pod_reasons.insert(0, phase.clone());
        self.pod_phase = phase;
        self
    }

    /// Record a container reason both pod-wide and per container
    pub fn with_container_reason(
        mut self,
        container: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        self.pod_reasons.push(reason.clone());
        self.reasons_by_container
            .entry(container.into())
            .or_default()
            .push(reason);
        self
    }

    pub fn with_restarts(mut self, restarts: u32) -> Self {
        self.total_restarts = restarts;
        self
    }

    pub fn with_not_ready(mut self, containers: u32) -> Self {
        self.not_ready_containers = containers;
        self
    }

    pub fn with_owner(mut self, kind: &str, name: &str) -> Self {
        self.owners.push(format!("{kind}/{name}"));
        self
    }

    /// `namespace/name`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Age relative to `now`; `None` when the creation time is unknown
    pub fn age_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now - created)
    }

    pub fn phase_is(&self, phase: &str) -> bool {
        self.pod_phase.eq_ignore_ascii_case(phase)
    }

    /// Running phase with no reason other than the phase itself or `Running`
    pub fn is_clean_running(&self) -> bool {
        self.phase_is(RUNNING_REASON) && self.has_only_benign_reasons()
    }

    pub(crate) fn has_only_benign_reasons(&self) -> bool {
        self.pod_reasons.iter().all(|reason| {
            reason.eq_ignore_ascii_case(&self.pod_phase)
                || reason.eq_ignore_ascii_case(RUNNING_REASON)
        })
    }

    /// Neither clean Running nor Succeeded
    pub fn is_unhealthy(&self) -> bool {
        !self.is_clean_running() && !self.phase_is("Succeeded")
    }
}

/// True for one of the five canonical pod phases (any case)
pub fn is_pod_phase(status: &str) -> bool {
    POD_PHASES.iter().any(|p| p.eq_ignore_ascii_case(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_running() {
        let pod = Candidate::new("dev", "web-1")
            .with_phase("Running")
            .with_container_reason("app", "Running")
            .with_container_reason("sidecar", "Running");
        assert!(pod.is_clean_running());
        assert!(!pod.is_unhealthy());
    }

    #[test]
    fn test_running_with_crashloop_is_unhealthy() {
        let pod = Candidate::new("dev", "web-1")
            .with_phase("Running")
            .with_container_reason("app", "CrashLoopBackOff");
        assert!(!pod.is_clean_running());
        assert!(pod.is_unhealthy());
    }

    #[test]
    fn test_succeeded_is_healthy() {
        let pod = Candidate::new("jobs", "migrate-x")
            .with_phase("Succeeded")
            .with_container_reason("main", "Completed");
        assert!(!pod.is_unhealthy());
    }

    #[test]
    fn test_pending_and_empty_phase_are_unhealthy() {
        assert!(Candidate::new("dev", "p").with_phase("Pending").is_unhealthy());
        assert!(Candidate::new("dev", "svc").is_unhealthy());
    }

    #[test]
    fn test_age_at() {
        let now = Utc::now();
        let c = Candidate::new("dev", "a").with_created_at(now - Duration::hours(2));
        assert_eq!(c.age_at(now), Some(Duration::hours(2)));
        assert_eq!(Candidate::new("dev", "b").age_at(now), None);
    }

    #[test]
    fn test_is_pod_phase() {
        assert!(is_pod_phase("running"));
        assert!(is_pod_phase("Unknown"));
        assert!(!is_pod_phase("CrashLoopBackOff"));
    }

    #[test]
    fn test_builder_tracks_reasons_per_container() {
        let pod = Candidate::new("dev", "api")
            .with_phase("Running")
            .with_container_reason("app", "OOMKilled");
        assert_eq!(pod.pod_reasons, vec!["Running", "OOMKilled"]);
        assert_eq!(pod.reasons_by_container["app"], vec!["OOMKilled"]);
        assert_eq!(pod.qualified_name(), "dev/api");
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"namespace":"dev","name":"api","podPhase":"Running","totalRestarts":3}"#;
        let c: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(c.pod_phase, "Running");
        assert_eq!(c.total_restarts, 3);
        assert!(c.labels.is_none());
    }
}
