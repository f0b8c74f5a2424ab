//! Root-policy status aggregation.
//!
//! A root policy's status is recomputed from its replicated copies whenever
//! one of them changes. The mapper feeds this reconciler: any event on a
//! replicated policy arrives here as a request for the owning root.

use crate::client;
use crate::models::{
    ClusterCompliance, ComplianceState, Policy, PolicyStatus, Result, RootPolicyId,
    ROOT_POLICY_LABEL,
};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, ResourceExt};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ReconcileRequest, ReconcilerContext};

/// Aggregate per-copy compliance into the root's compliance.
///
/// Any noncompliant copy makes the root noncompliant; otherwise any copy
/// that has not reported yet keeps the root pending. A root with no copies
/// has nothing to report.
pub fn aggregate_compliance(states: &[Option<ComplianceState>]) -> Option<ComplianceState> {
    if states.is_empty() {
        return None;
    }
    if states
        .iter()
        .any(|s| *s == Some(ComplianceState::NonCompliant))
    {
        return Some(ComplianceState::NonCompliant);
    }
    if states
        .iter()
        .any(|s| s.is_none() || *s == Some(ComplianceState::Pending))
    {
        return Some(ComplianceState::Pending);
    }
    Some(ComplianceState::Compliant)
}

/// Build the desired root status from observed copies.
///
/// Entries are sorted by cluster namespace so repeated reconciles produce
/// identical statuses.
pub fn desired_status(mut copies: Vec<(String, Option<ComplianceState>)>) -> PolicyStatus {
    copies.sort_by(|a, b| a.0.cmp(&b.0));

    let states: Vec<Option<ComplianceState>> = copies.iter().map(|(_, s)| *s).collect();
    PolicyStatus {
        compliance_state: aggregate_compliance(&states),
        per_cluster: copies
            .into_iter()
            .map(|(cluster_namespace, compliance_state)| ClusterCompliance {
                cluster_namespace,
                compliance_state,
            })
            .collect(),
    }
}

/// Reconcile the aggregate status of one root policy.
pub async fn reconcile_root_policy(
    ctx: Arc<ReconcilerContext>,
    request: ReconcileRequest,
) -> Result<()> {
    debug!(request = %request, "Reconciling root policy status");

    let api: Api<Policy> = Api::namespaced(ctx.client.clone(), &request.namespace);
    let root = match api.get(&request.name).await {
        Ok(policy) => policy,
        Err(err) if client::is_not_found(&err) => {
            // Copies are cleaned up by the propagation machinery.
            debug!(request = %request, "Root policy not found, nothing to aggregate");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    let desired = if root.spec.disabled {
        // A disabled policy reports nothing; re-enabling starts clean.
        PolicyStatus::default()
    } else {
        let cluster_namespaces = ctx.cluster_namespaces().await?;
        let root_id = RootPolicyId {
            namespace: request.namespace.clone(),
            name: request.name.clone(),
        };

        let all: Api<Policy> = Api::all(ctx.client.clone());
        let selector = format!("{ROOT_POLICY_LABEL}={root_id}");
        let copies = all.list(&ListParams::default().labels(&selector)).await?;

        let observed: Vec<(String, Option<ComplianceState>)> = copies
            .items
            .iter()
            .filter_map(|p| p.namespace().map(|ns| (ns, p)))
            .filter(|(ns, _)| cluster_namespaces.contains(ns))
            .map(|(ns, p)| (ns, p.status.as_ref().and_then(|s| s.compliance_state)))
            .collect();

        desired_status(observed)
    };

    let current = root.status.clone().unwrap_or_default();
    if current == desired {
        debug!(request = %request, "Root policy status unchanged");
        return Ok(());
    }

    info!(
        request = %request,
        compliance = ?desired.compliance_state,
        clusters = desired.per_cluster.len(),
        "Updating root policy status"
    );

    let patch = json!({
        "status": {
            "complianceState": desired.compliance_state,
            "perCluster": desired.per_cluster,
        }
    });
    api.patch_status(&request.name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_any_noncompliant_wins() {
        let states = vec![
            Some(ComplianceState::Compliant),
            Some(ComplianceState::NonCompliant),
            None,
        ];
        assert_eq!(
            aggregate_compliance(&states),
            Some(ComplianceState::NonCompliant)
        );
    }

    #[test]
    fn test_aggregate_unreported_copy_keeps_pending() {
        let states = vec![Some(ComplianceState::Compliant), None];
        assert_eq!(aggregate_compliance(&states), Some(ComplianceState::Pending));

        let states = vec![
            Some(ComplianceState::Compliant),
            Some(ComplianceState::Pending),
        ];
        assert_eq!(aggregate_compliance(&states), Some(ComplianceState::Pending));
    }

    #[test]
    fn test_aggregate_all_compliant() {
        let states = vec![
            Some(ComplianceState::Compliant),
            Some(ComplianceState::Compliant),
        ];
        assert_eq!(
            aggregate_compliance(&states),
            Some(ComplianceState::Compliant)
        );
    }

    #[test]
    fn test_aggregate_no_copies() {
        assert_eq!(aggregate_compliance(&[]), None);
    }

    #[test]
    fn test_desired_status_is_sorted_by_cluster() {
        let status = desired_status(vec![
            ("cluster-west".to_string(), Some(ComplianceState::Compliant)),
            (
                "cluster-east".to_string(),
                Some(ComplianceState::NonCompliant),
            ),
        ]);

        assert_eq!(
            status.compliance_state,
            Some(ComplianceState::NonCompliant)
        );
        assert_eq!(status.per_cluster[0].cluster_namespace, "cluster-east");
        assert_eq!(status.per_cluster[1].cluster_namespace, "cluster-west");
    }
}
