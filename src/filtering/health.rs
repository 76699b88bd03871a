// Pod health rules: restarts, readiness, reasons, statuses
use crate::candidate::{is_pod_phase, Candidate, RUNNING_REASON};
use crate::error::{KwildError, Result};
use crate::filtering::options::HealthSpec;
use crate::filtering::utils::contains_ignore_case;

/// Comparison operator of a restart expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

/// Parsed restart comparison such as `>=3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartExpr {
    pub op: CompareOp,
    pub value: u64,
}

impl RestartExpr {
    /// Parse `>N`, `>=N`, `<N`, `<=N`, `=N` or a bare `N` (meaning `=N`)
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim();
        let (op, digits) = if let Some(rest) = expr.strip_prefix(">=") {
            (CompareOp::Ge, rest)
        } else if let Some(rest) = expr.strip_prefix("<=") {
            (CompareOp::Le, rest)
        } else if let Some(rest) = expr.strip_prefix('>') {
            (CompareOp::Gt, rest)
        } else if let Some(rest) = expr.strip_prefix('<') {
            (CompareOp::Lt, rest)
        } else if let Some(rest) = expr.strip_prefix('=') {
            (CompareOp::Eq, rest)
        } else {
            (CompareOp::Eq, expr)
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        // Beyond u64 no restart count can reach it
        let value = digits.parse().unwrap_or(u64::MAX);
        Some(Self { op, value })
    }

    pub fn matches(&self, restarts: u32) -> bool {
        let restarts = u64::from(restarts);
        match self.op {
            CompareOp::Gt => restarts > self.value,
            CompareOp::Ge => restarts >= self.value,
            CompareOp::Lt => restarts < self.value,
            CompareOp::Le => restarts <= self.value,
            CompareOp::Eq => restarts == self.value,
        }
    }
}

/// Evaluate a raw restart expression; malformed input never matches
pub fn compare_restarts(restarts: u32, expr: &str) -> bool {
    RestartExpr::parse(expr).is_some_and(|e| e.matches(restarts))
}

/// Every wanted reason must appear, pod-wide or within `container`
pub fn reasons_match(candidate: &Candidate, wanted: &[String], container: Option<&str>) -> bool {
    let observed: &[String] = match container {
        None => &candidate.pod_reasons,
        Some(name) => candidate
            .reasons_by_container
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
    };
    wanted.iter().all(|w| contains_ignore_case(observed, w))
}

/// Any requested status matches. Phases compare against the pod phase
/// (`Running` additionally requires only benign reasons); anything else is
/// looked up among the pod reasons.
pub fn status_matches(candidate: &Candidate, statuses: &[String]) -> bool {
    statuses.iter().any(|status| {
        if is_pod_phase(status) {
            if !candidate.phase_is(status) {
                return false;
            }
            !status.eq_ignore_ascii_case(RUNNING_REASON) || candidate.has_only_benign_reasons()
        } else {
            contains_ignore_case(&candidate.pod_reasons, status)
        }
    })
}

/// Compiled pod health rules
#[derive(Debug, Clone, Default)]
pub struct HealthRules {
    restarts: Option<RestartExpr>,
    containers_not_ready: bool,
    reasons: Vec<String>,
    container: Option<String>,
    pod_statuses: Vec<String>,
    unhealthy: bool,
}

impl HealthRules {
    pub fn compile(spec: &HealthSpec) -> Result<Self> {
        let restarts = spec
            .restarts
            .as_deref()
            .map(|expr| {
                RestartExpr::parse(expr).ok_or_else(|| {
                    KwildError::invalid_syntax(
                        "restart expression",
                        expr,
                        "expected >N, >=N, <N, <=N, =N or N with a non-negative integer",
                    )
                })
            })
            .transpose()?;

        Ok(Self {
            restarts,
            containers_not_ready: spec.containers_not_ready,
            reasons: spec.reasons.clone(),
            container: spec.container.clone().filter(|c| !c.is_empty()),
            pod_statuses: spec.pod_statuses.clone(),
            unhealthy: spec.unhealthy,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.restarts.is_none()
            && !self.containers_not_ready
            && self.reasons.is_empty()
            && self.pod_statuses.is_empty()
            && !self.unhealthy
    }

    pub fn allows(&self, candidate: &Candidate) -> bool {
        if !self.pod_statuses.is_empty() && !status_matches(candidate, &self.pod_statuses) {
            return false;
        }
        if let Some(expr) = &self.restarts {
            if !expr.matches(candidate.total_restarts) {
                return false;
            }
        }
        if self.containers_not_ready && candidate.not_ready_containers == 0 {
            return false;
        }
        if !self.reasons.is_empty()
            && !reasons_match(candidate, &self.reasons, self.container.as_deref())
        {
            return false;
        }
        !self.unhealthy || candidate.is_unhealthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_restart_expr_all_ops() {
        assert!(compare_restarts(2, ">1"));
        assert!(!compare_restarts(0, ">1"));
        assert!(compare_restarts(1, ">=1"));
        assert!(compare_restarts(0, "<1"));
        assert!(!compare_restarts(1, "<1"));
        assert!(compare_restarts(1, "<=1"));
        assert!(compare_restarts(3, "=3"));
        assert!(compare_restarts(3, "3"));
        assert!(!compare_restarts(4, "3"));
    }

    #[test]
    fn test_restart_expr_malformed() {
        assert!(!compare_restarts(1, ">x"));
        assert!(!compare_restarts(0, ">"));
        assert!(!compare_restarts(1, "=>1"));
        assert!(!compare_restarts(1, "-1"));
        assert_eq!(RestartExpr::parse("abc"), None);
    }

    #[test]
    fn test_restart_expr_beyond_u32() {
        let expr = RestartExpr::parse(">=5000000000").unwrap();
        assert_eq!(expr.value, 5_000_000_000);
        assert!(!expr.matches(u32::MAX));
        assert!(compare_restarts(u32::MAX, "<5000000000"));
        assert!(compare_restarts(3, "<99999999999999999999999"));

        let spec = HealthSpec {
            restarts: Some(">=5000000000".into()),
            ..Default::default()
        };
        assert!(HealthRules::compile(&spec).is_ok());
    }

    #[test]
    fn test_compile_rejects_bad_restart_expr() {
        let spec = HealthSpec {
            restarts: Some(">many".into()),
            ..Default::default()
        };
        let err = HealthRules::compile(&spec).unwrap_err();
        assert!(matches!(err, KwildError::InvalidFilterSyntax { .. }));
    }

    #[test]
    fn test_status_running_excludes_crashloop() {
        let crashing = Candidate::new("dev", "a")
            .with_phase("Running")
            .with_container_reason("app", "CrashLoopBackOff");
        let clean = Candidate::new("dev", "b")
            .with_phase("Running")
            .with_container_reason("app", "Running");
        let statuses = strings(&["Running"]);
        assert!(!status_matches(&crashing, &statuses));
        assert!(status_matches(&clean, &statuses));
    }

    #[test]
    fn test_status_phase_case_insensitive() {
        let pending = Candidate::new("dev", "p").with_phase("Pending");
        assert!(status_matches(&pending, &strings(&["pending"])));
        assert!(!status_matches(&pending, &strings(&["failed"])));
    }

    #[test]
    fn test_status_container_reason_or() {
        let crashing = Candidate::new("dev", "a")
            .with_phase("Running")
            .with_container_reason("app", "CrashLoopBackOff");
        assert!(status_matches(
            &crashing,
            &strings(&["ImagePullBackOff", "crashloopbackoff"])
        ));
        assert!(!status_matches(&crashing, &strings(&["OOMKilled"])));
    }

    #[test]
    fn test_reasons_unscoped_all_required() {
        let pod = Candidate::new("dev", "a")
            .with_phase("Running")
            .with_container_reason("app", "OOMKilled")
            .with_container_reason("sidecar", "Error");
        assert!(reasons_match(&pod, &strings(&["oomkilled", "error"]), None));
        assert!(!reasons_match(&pod, &strings(&["OOMKilled", "Evicted"]), None));
    }

    #[test]
    fn test_reasons_container_scoped() {
        let pod = Candidate::new("dev", "a")
            .with_phase("Running")
            .with_container_reason("app", "OOMKilled")
            .with_container_reason("sidecar", "Error");
        assert!(reasons_match(&pod, &strings(&["OOMKilled"]), Some("app")));
        assert!(!reasons_match(&pod, &strings(&["OOMKilled"]), Some("sidecar")));
        assert!(!reasons_match(&pod, &strings(&["OOMKilled"]), Some("missing")));
    }

    #[test]
    fn test_rules_containers_not_ready() {
        let rules = HealthRules::compile(&HealthSpec {
            containers_not_ready: true,
            ..Default::default()
        })
        .unwrap();
        assert!(rules.allows(&Candidate::new("dev", "a").with_not_ready(1)));
        assert!(!rules.allows(&Candidate::new("dev", "b")));
    }

    #[test]
    fn test_rules_unhealthy() {
        let rules = HealthRules::compile(&HealthSpec {
            unhealthy: true,
            ..Default::default()
        })
        .unwrap();
        let clean = Candidate::new("dev", "ok")
            .with_phase("Running")
            .with_container_reason("app", "Running");
        let done = Candidate::new("dev", "job").with_phase("Succeeded");
        let failed = Candidate::new("dev", "bad").with_phase("Failed");
        assert!(!rules.allows(&clean));
        assert!(!rules.allows(&done));
        assert!(rules.allows(&failed));
    }

    #[test]
    fn test_rules_combine_with_and() {
        let rules = HealthRules::compile(&HealthSpec {
            restarts: Some(">=2".into()),
            reasons: strings(&["CrashLoopBackOff"]),
            ..Default::default()
        })
        .unwrap();
        let looping = Candidate::new("dev", "a")
            .with_phase("Running")
            .with_container_reason("app", "CrashLoopBackOff")
            .with_restarts(5);
        let fresh = looping.clone().with_restarts(1);
        assert!(rules.allows(&looping));
        assert!(!rules.allows(&fresh));
    }

    #[test]
    fn test_empty_rules_allow_everything() {
        let rules = HealthRules::compile(&HealthSpec::default()).unwrap();
        assert!(rules.is_empty());
        assert!(rules.allows(&Candidate::new("dev", "x")));
    }
}
