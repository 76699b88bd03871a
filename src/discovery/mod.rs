//! Resource discovery
//!
//! Discovery produces the candidate list the filter runs over. The binary
//! reads a `kubectl get <kind> -o json` list document from a file or stdin;
//! tests and embedders can hand candidates over directly with
//! [`StaticDiscovery`].

use crate::candidate::{Candidate, RUNNING_REASON};
use crate::error::{KwildError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

/// Source of candidates for one resource kind
pub trait ResourceDiscovery {
    /// List every candidate of `resource`
    ///
    /// # Errors
    /// * `Discovery` - the listing could not be obtained
    /// * `Json` - the listing could not be decoded
    fn discover(&self, resource: &str) -> Result<Vec<Candidate>>;
}

/// Fixed, in-memory candidate list
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    candidates: Vec<Candidate>,
}

impl StaticDiscovery {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }
}

impl ResourceDiscovery for StaticDiscovery {
    fn discover(&self, _resource: &str) -> Result<Vec<Candidate>> {
        Ok(self.candidates.clone())
    }
}

/// Where a JSON list document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonSource {
    File(PathBuf),
    Stdin,
}

/// Decodes `kubectl get <kind> -o json` output
#[derive(Debug, Clone)]
pub struct JsonListDiscovery {
    source: JsonSource,
}

impl JsonListDiscovery {
    pub fn new(source: JsonSource) -> Self {
        Self { source }
    }

    /// Read from a file, or stdin when `path` is `-`
    pub fn from_arg(path: &str) -> Self {
        if path == "-" {
            Self::new(JsonSource::Stdin)
        } else {
            Self::new(JsonSource::File(PathBuf::from(path)))
        }
    }

    pub fn source(&self) -> &JsonSource {
        &self.source
    }

    fn read_document(&self) -> Result<String> {
        match &self.source {
            JsonSource::File(path) => {
                std::fs::read_to_string(path).map_err(|e| KwildError::Io {
                    source: e,
                    context: format!("Failed to read resource list {}", path.display()),
                })
            }
            JsonSource::Stdin => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| KwildError::Io {
                        source: e,
                        context: "Failed to read resource list from stdin".to_string(),
                    })?;
                Ok(buf)
            }
        }
    }
}

impl ResourceDiscovery for JsonListDiscovery {
    fn discover(&self, resource: &str) -> Result<Vec<Candidate>> {
        let document = self.read_document()?;
        if document.trim().is_empty() {
            return Err(KwildError::Discovery(format!(
                "empty resource list for '{resource}'"
            )));
        }
        let candidates = parse_list(&document)?;
        tracing::debug!(
            resource,
            count = candidates.len(),
            "Discovered candidates"
        );
        Ok(candidates)
    }
}

/// Decode a Kubernetes list document into candidates
///
/// Only the fields the filters read are decoded; anything else in the
/// document is ignored.
pub fn parse_list(document: &str) -> Result<Vec<Candidate>> {
    let list: ResourceList = serde_json::from_str(document).map_err(|e| KwildError::Json {
        source: e,
        context: "Failed to parse resource list".to_string(),
    })?;
    Ok(list.items.into_iter().map(Item::into_candidate).collect())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResourceList {
    items: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Item {
    metadata: Metadata,
    spec: Option<PodSpec>,
    status: Option<PodStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Metadata {
    name: String,
    namespace: String,
    creation_timestamp: Option<String>,
    labels: Option<BTreeMap<String, String>>,
    annotations: Option<BTreeMap<String, String>>,
    owner_references: Vec<OwnerReference>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwnerReference {
    kind: String,
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PodSpec {
    node_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PodStatus {
    phase: String,
    container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ContainerStatus {
    name: String,
    ready: bool,
    restart_count: i64,
    state: Option<ContainerState>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContainerState {
    waiting: Option<StateReason>,
    terminated: Option<StateReason>,
    running: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StateReason {
    reason: String,
}

impl ContainerState {
    /// Waiting reason, terminated reason, then `Running` for a running container
    fn reasons(&self) -> impl Iterator<Item = &str> {
        let waiting = self.waiting.as_ref().map(|w| w.reason.as_str());
        let terminated = self.terminated.as_ref().map(|t| t.reason.as_str());
        let running = self.running.as_ref().map(|_| RUNNING_REASON);
        [waiting, terminated, running]
            .into_iter()
            .flatten()
            .filter(|r| !r.is_empty())
    }
}

impl Item {
    fn into_candidate(self) -> Candidate {
        let Metadata {
            name,
            namespace,
            creation_timestamp,
            labels,
            annotations,
            owner_references,
        } = self.metadata;

        let mut candidate = Candidate {
            namespace,
            name,
            created_at: creation_timestamp.as_deref().and_then(parse_timestamp),
            labels,
            annotations,
            node_name: self.spec.map(|s| s.node_name).unwrap_or_default(),
            owners: owner_references
                .into_iter()
                .filter(|o| !o.kind.is_empty() && !o.name.is_empty())
                .map(|o| format!("{}/{}", o.kind, o.name))
                .collect(),
            ..Default::default()
        };

        if let Some(status) = self.status {
            if !status.phase.is_empty() {
                candidate.pod_reasons.push(status.phase.clone());
                candidate.pod_phase = status.phase;
            }
            let mut restarts: u64 = 0;
            for cs in &status.container_statuses {
                restarts = restarts.saturating_add(cs.restart_count.max(0) as u64);
                if !cs.ready {
                    candidate.not_ready_containers += 1;
                }
                let Some(state) = &cs.state else {
                    continue;
                };
                for reason in state.reasons() {
                    candidate.pod_reasons.push(reason.to_string());
                    candidate
                        .reasons_by_container
                        .entry(cs.name.clone())
                        .or_default()
                        .push(reason.to_string());
                }
            }
            candidate.total_restarts = u32::try_from(restarts).unwrap_or(u32::MAX);
        }

        candidate
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
