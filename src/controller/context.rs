//! Shared reconcile context and request types.

use crate::client;
use crate::metrics::MetricsRegistry;
use crate::models::{Policy, Result};
use kube::{Client, ResourceExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Target of one reconcile pass: a policy name and namespace.
///
/// K_i: Requests outlive the objects that triggered them; by the time a
/// worker runs, the policy may already be gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Request for the object itself. None for objects without a namespace.
    pub fn for_object(policy: &Policy) -> Option<Self> {
        let namespace = policy.namespace()?;
        Some(Self::new(namespace, policy.name_any()))
    }
}

impl std::fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Context shared by all reconcile functions.
///
/// Thread-safe: cloned into every worker behind an `Arc`.
pub struct ReconcilerContext {
    /// Kubernetes API client
    pub client: Client,
    /// Metrics registry backing the compliance gauge
    pub metrics: Arc<MetricsRegistry>,
}

impl ReconcilerContext {
    pub fn new(client: Client, metrics: Arc<MetricsRegistry>) -> Self {
        Self { client, metrics }
    }

    /// Current set of managed-cluster namespaces.
    ///
    /// I^B: Membership changes at any time; callers re-list per event
    /// rather than caching.
    pub async fn cluster_namespaces(&self) -> Result<HashSet<String>> {
        let clusters = client::list_clusters(&self.client).await?;
        Ok(client::namespace_set(&clusters))
    }
}
