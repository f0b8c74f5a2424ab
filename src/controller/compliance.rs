//! Compliance gauge reconciliation.
//!
//! Epistemic foundation:
//! - K_i: Whether a policy is root or replicated is derived from the
//!   request, not the object: the object may already be deleted
//! - K_i: Replicated policies are named `<namespace>.<name>`
//! - B_i: The policy still exists (a 404 means the series must go)

use crate::client;
use crate::metrics::ComplianceLabels;
use crate::models::{ComplianceState, Policy, Result, RootPolicyId};
use kube::Api;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ReconcileRequest, ReconcilerContext};

/// Derive the gauge label set for a request.
///
/// Requests in cluster namespaces describe replicated policies and must be
/// named `<namespace>.<name>`; a replicated policy without that prefix is
/// invalid and gets no series (`None`). Everything else is a root policy,
/// whose series uses the no-cluster sentinel.
pub fn compliance_labels(
    request: &ReconcileRequest,
    cluster_namespaces: &HashSet<String>,
) -> Option<ComplianceLabels> {
    if cluster_namespaces.contains(&request.namespace) {
        let root = RootPolicyId::parse(&request.name)?;
        Some(ComplianceLabels::propagated(&root, request.namespace.clone()))
    } else {
        Some(ComplianceLabels::root(
            request.name.clone(),
            request.namespace.clone(),
        ))
    }
}

/// Reconcile the compliance gauge for one policy.
///
/// Keeps the exported series in lockstep with the policy: deleted and
/// disabled policies lose their series, everything else reports 0 when
/// compliant and 1 when noncompliant.
pub async fn reconcile_compliance(
    ctx: Arc<ReconcilerContext>,
    request: ReconcileRequest,
) -> Result<()> {
    debug!(request = %request, "Reconciling compliance metric");

    let cluster_namespaces = ctx.cluster_namespaces().await?;

    let Some(labels) = compliance_labels(&request, &cluster_namespaces) else {
        info!(
            request = %request,
            "Invalid policy in cluster namespace: missing root policy prefix"
        );
        return Ok(());
    };

    let api: Api<Policy> = Api::namespaced(ctx.client.clone(), &request.namespace);
    let policy = match api.get(&request.name).await {
        Ok(policy) => policy,
        Err(err) if client::is_not_found(&err) => {
            // Best effort: log whether a series was actually deleted.
            let deleted = ctx.metrics.policy().remove(&labels);
            info!(
                request = %request,
                status_gauge_deleted = deleted,
                "Policy not found, must have been deleted"
            );
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    if policy.spec.disabled {
        let deleted = ctx.metrics.policy().remove(&labels);
        info!(
            request = %request,
            status_gauge_deleted = deleted,
            "Metric removed for disabled policy"
        );
        return Ok(());
    }

    let state = policy.status.as_ref().and_then(|s| s.compliance_state);
    debug!(request = %request, state = ?state, "Observed compliance state");

    // The series exists as soon as the policy is governed, even before any
    // compliance is reported.
    ctx.metrics.policy().touch(&labels);
    match state {
        Some(ComplianceState::Compliant) => ctx.metrics.policy().set(&labels, 0),
        Some(ComplianceState::NonCompliant) => ctx.metrics.policy().set(&labels, 1),
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{PolicyType, NO_CLUSTER_NAMESPACE};

    fn clusters(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_labels_for_replicated_policy() {
        let request = ReconcileRequest::new("cluster-east", "governance.require-limits");
        let labels = compliance_labels(&request, &clusters(&["cluster-east"])).unwrap();

        assert_eq!(labels.policy_type, PolicyType::Propagated);
        assert_eq!(labels.name, "require-limits");
        assert_eq!(labels.policy_namespace, "governance");
        assert_eq!(labels.cluster_namespace, "cluster-east");
    }

    #[test]
    fn test_labels_for_root_policy() {
        let request = ReconcileRequest::new("governance", "require-limits");
        let labels = compliance_labels(&request, &clusters(&["cluster-east"])).unwrap();

        assert_eq!(labels.policy_type, PolicyType::Root);
        assert_eq!(labels.name, "require-limits");
        assert_eq!(labels.policy_namespace, "governance");
        assert_eq!(labels.cluster_namespace, NO_CLUSTER_NAMESPACE);
    }

    #[test]
    fn test_invalid_name_in_cluster_namespace_gets_no_series() {
        // lives in a cluster namespace but lacks the <namespace>.<name> form
        let request = ReconcileRequest::new("cluster-east", "no-prefix");
        assert!(compliance_labels(&request, &clusters(&["cluster-east"])).is_none());
    }

    #[test]
    fn test_dotted_name_outside_cluster_namespace_is_root() {
        // a dotted name alone does not make a policy replicated
        let request = ReconcileRequest::new("governance", "policy.v2");
        let labels = compliance_labels(&request, &clusters(&["cluster-east"])).unwrap();
        assert_eq!(labels.policy_type, PolicyType::Root);
        assert_eq!(labels.name, "policy.v2");
    }
}
