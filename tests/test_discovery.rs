// Discovery from kubectl JSON listings into the filter pipeline
use std::io::Write;
use std::sync::Arc;

use kwild::action::{ActionPlan, DryRunExecutor, MatchedRef, Verb};
use kwild::discovery::{JsonListDiscovery, JsonSource, ResourceDiscovery};
use kwild::filtering::{CompiledFilter, FilterPipeline, FilterSpec};
use kwild::KwildError;
use tempfile::NamedTempFile;

const PODS: &str = r#"{
  "apiVersion": "v1",
  "kind": "List",
  "items": [
    {
      "metadata": {
        "name": "api-1-7f9c6d8b9c-x2z4q",
        "namespace": "prod",
        "creationTimestamp": "2025-01-01T00:00:00Z",
        "labels": {"app": "api"},
        "ownerReferences": [{"kind": "ReplicaSet", "name": "api-1-7f9c6d8b9c"}]
      },
      "spec": {"nodeName": "node-a1"},
      "status": {
        "phase": "Running",
        "containerStatuses": [
          {"name": "app", "ready": true, "restartCount": 0, "state": {"running": {}}}
        ]
      }
    },
    {
      "metadata": {
        "name": "web-1-5d8f7c9b6-k3j2h",
        "namespace": "prod",
        "creationTimestamp": "2025-01-01T00:00:00Z",
        "labels": {"app": "web"}
      },
      "spec": {"nodeName": "node-b1"},
      "status": {
        "phase": "Running",
        "containerStatuses": [
          {"name": "app", "ready": false, "restartCount": 12,
           "state": {"waiting": {"reason": "CrashLoopBackOff"}}},
          {"name": "proxy", "ready": false, "restartCount": 1,
           "state": {"terminated": {"reason": "OOMKilled"}}}
        ]
      }
    },
    {
      "metadata": {"name": "report-29001", "namespace": "batch"},
      "status": {"phase": "Succeeded"}
    }
  ]
}"#;

fn write_listing(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_discover_from_file() {
    let file = write_listing(PODS);
    let discovery = JsonListDiscovery::new(JsonSource::File(file.path().to_path_buf()));
    let candidates = discovery.discover("pods").unwrap();

    assert_eq!(candidates.len(), 3);
    let web = &candidates[1];
    assert_eq!(web.total_restarts, 13);
    assert_eq!(web.not_ready_containers, 2);
    assert_eq!(web.pod_reasons, vec!["Running", "CrashLoopBackOff", "OOMKilled"]);
    assert_eq!(web.reasons_by_container["proxy"], vec!["OOMKilled"]);
    assert!(candidates[2].created_at.is_none());
}

#[test]
fn test_missing_file_is_io_error() {
    let discovery = JsonListDiscovery::from_arg("/nonexistent/kwild/pods.json");
    assert!(matches!(
        discovery.discover("pods"),
        Err(KwildError::Io { .. })
    ));
}

#[test]
fn test_empty_document_is_discovery_error() {
    let file = write_listing("   \n");
    let discovery = JsonListDiscovery::new(JsonSource::File(file.path().to_path_buf()));
    assert!(matches!(
        discovery.discover("pods"),
        Err(KwildError::Discovery(_))
    ));
}

#[test]
fn test_unhealthy_pods_to_delete_plan() {
    let file = write_listing(PODS);
    let discovery = JsonListDiscovery::new(JsonSource::File(file.path().to_path_buf()));
    let candidates = discovery.discover("pods").unwrap();

    let mut spec = FilterSpec::new("pods");
    spec.health.unhealthy = true;
    spec.health.reasons = vec!["oomkilled".to_string()];
    let filter = CompiledFilter::compile(&spec).unwrap();
    let (matched, _) = FilterPipeline::new(Arc::new(filter)).filter(&candidates);

    let refs: Vec<MatchedRef> = matched
        .iter()
        .map(|c| MatchedRef::from_candidate(c, false))
        .collect();
    let plan = ActionPlan::new(Verb::Delete, "pods", refs, false);
    assert!(plan.check_confirm_threshold(5, false).is_ok());

    let mut executor = DryRunExecutor::new(Vec::new());
    plan.execute(&mut executor).unwrap();
    let out = String::from_utf8(executor.into_inner()).unwrap();
    assert_eq!(out, "kubectl delete pods web-1-5d8f7c9b6-k3j2h -n prod\n");
}
