//! Maps policy object events to root-policy reconcile requests.
//!
//! Epistemic foundation:
//! - K_i: Replicated policies carry the root-policy label
//! - K_i: Replicated policies live in managed-cluster namespaces
//! - B_i: The cluster list is current enough for the event being mapped
//! - I^B: Policies without the local-resource label belong to the global
//!   hub and must not be reconciled here

use crate::models::{Policy, Result, RootPolicyId, LOCAL_RESOURCE_LABEL, ROOT_POLICY_LABEL};
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use super::{ReconcileRequest, ReconcilerContext};

/// Decide the root-policy request for a policy event.
///
/// Pure core of [`map_policy_event`]; `cluster_namespaces` is the current
/// managed-cluster namespace set.
pub fn root_request_for(
    name: &str,
    namespace: &str,
    labels: &BTreeMap<String, String>,
    cluster_namespaces: &HashSet<String>,
) -> Option<ReconcileRequest> {
    let request = match labels.get(ROOT_POLICY_LABEL) {
        Some(value) => {
            // root-policy label exists, should be a replicated policy
            debug!(name, namespace, "Found reconciliation request from replicated policy");

            let Some(root) = RootPolicyId::parse(value) else {
                warn!(name, namespace, value = %value, "Malformed root-policy label, skipping");
                return None;
            };

            // do not handle a replicated policy outside the cluster namespaces
            if !cluster_namespaces.contains(namespace) {
                debug!(name, namespace, "Replicated policy in non-cluster namespace, skipping");
                return None;
            }

            ReconcileRequest::new(root.namespace, root.name)
        }
        None => {
            // root-policy label doesn't exist, should be a root policy
            debug!(name, namespace, "Found reconciliation request from root policy");
            ReconcileRequest::new(namespace, name)
        }
    };

    if !labels.contains_key(LOCAL_RESOURCE_LABEL) {
        debug!(name, namespace, "Found a globally managed policy, skipping");
        return None;
    }

    Some(request)
}

/// Map a policy event to the reconcile request of its owning root policy.
///
/// The cluster list is only consulted for replicated policies; root-policy
/// events are mapped without an API round trip.
pub async fn map_policy_event(
    ctx: &ReconcilerContext,
    policy: &Policy,
) -> Result<Option<ReconcileRequest>> {
    let name = policy.name_any();
    let Some(namespace) = policy.namespace() else {
        return Ok(None);
    };

    let labels = policy.labels();
    let cluster_namespaces = if labels.contains_key(ROOT_POLICY_LABEL) {
        ctx.cluster_namespaces().await?
    } else {
        HashSet::new()
    };

    Ok(root_request_for(
        &name,
        &namespace,
        labels,
        &cluster_namespaces,
    ))
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

    fn clusters(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_root_policy_maps_to_itself() {
        let request = root_request_for(
            "require-limits",
            "governance",
            &labels(&[(LOCAL_RESOURCE_LABEL, "true")]),
            &clusters(&[]),
        )
        .unwrap();
        assert_eq!(request, ReconcileRequest::new("governance", "require-limits"));
    }

    #[test]
    fn test_replicated_policy_maps_to_root() {
        let request = root_request_for(
            "governance.require-limits",
            "cluster-east",
            &labels(&[
                (ROOT_POLICY_LABEL, "governance.require-limits"),
                (LOCAL_RESOURCE_LABEL, "true"),
            ]),
            &clusters(&["cluster-east", "cluster-west"]),
        )
        .unwrap();
        assert_eq!(request, ReconcileRequest::new("governance", "require-limits"));
    }

    #[test]
    fn test_replicated_policy_outside_cluster_namespace_is_skipped() {
        let request = root_request_for(
            "governance.require-limits",
            "some-app-namespace",
            &labels(&[
                (ROOT_POLICY_LABEL, "governance.require-limits"),
                (LOCAL_RESOURCE_LABEL, "true"),
            ]),
            &clusters(&["cluster-east"]),
        );
        assert!(request.is_none());
    }

    #[test]
    fn test_malformed_root_policy_label_is_skipped() {
        let request = root_request_for(
            "broken",
            "cluster-east",
            &labels(&[
                (ROOT_POLICY_LABEL, "no-dot-in-value"),
                (LOCAL_RESOURCE_LABEL, "true"),
            ]),
            &clusters(&["cluster-east"]),
        );
        assert!(request.is_none());
    }

    #[test]
    fn test_policy_without_local_resource_label_is_skipped() {
        // applies to root policies...
        assert!(root_request_for("require-limits", "governance", &labels(&[]), &clusters(&[])).is_none());

        // ...and to replicated ones
        let request = root_request_for(
            "governance.require-limits",
            "cluster-east",
            &labels(&[(ROOT_POLICY_LABEL, "governance.require-limits")]),
            &clusters(&["cluster-east"]),
        );
        assert!(request.is_none());
    }
}
