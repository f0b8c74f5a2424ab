//! Managed cluster lookups.
//!
//! Epistemic foundation:
//! - K_i: Every managed cluster has a hub namespace with the cluster's name
//! - B_i: The cluster list is reachable (might fail, caller decides retry)
//! - I^B: Cluster membership changes at any time → re-listed per event

use crate::models::Result;
use kube::api::ListParams;
use kube::{Api, Client, CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// ManagedCluster custom resource (cluster-scoped).
///
/// Only `metadata.name` matters to this operator; the name doubles as the
/// cluster's namespace on the hub.
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.nomos.dev",
    version = "v1",
    kind = "ManagedCluster",
    plural = "managedclusters"
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    /// Whether the hub has accepted this cluster
    #[serde(default)]
    pub hub_accepts_client: bool,
}

/// List all managed clusters known to the hub.
pub async fn list_clusters(client: &Client) -> Result<Vec<ManagedCluster>> {
    let api: Api<ManagedCluster> = Api::all(client.clone());
    let clusters = api.list(&ListParams::default()).await?;
    Ok(clusters.items)
}

/// Check whether a namespace is the hub namespace of some managed cluster.
pub fn is_in_cluster_namespace(namespace: &str, clusters: &[ManagedCluster]) -> bool {
    clusters.iter().any(|c| c.name_any() == namespace)
}

/// Collect the set of cluster namespaces for repeated membership probes.
pub fn namespace_set(clusters: &[ManagedCluster]) -> HashSet<String> {
    clusters.iter().map(|c| c.name_any()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(name: &str) -> ManagedCluster {
        ManagedCluster::new(name, ManagedClusterSpec::default())
    }

    #[test]
    fn test_is_in_cluster_namespace() {
        let clusters = vec![cluster("cluster-east"), cluster("cluster-west")];
        assert!(is_in_cluster_namespace("cluster-east", &clusters));
        assert!(!is_in_cluster_namespace("governance", &clusters));
    }

    #[test]
    fn test_empty_cluster_list_has_no_namespaces() {
        assert!(!is_in_cluster_namespace("cluster-east", &[]));
        assert!(namespace_set(&[]).is_empty());
    }

    #[test]
    fn test_namespace_set() {
        let clusters = vec![cluster("a"), cluster("b"), cluster("a")];
        let set = namespace_set(&clusters);
        assert_eq!(set.len(), 2);
        assert!(set.contains("a"));
        assert!(set.contains("b"));
    }
}
