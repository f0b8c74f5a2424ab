//! Policy compliance collector.
//!
//! One gauge series per governed policy:
//! 0 = compliant, 1 = noncompliant. Series are deleted when the policy is
//! deleted or disabled, so absence of a series means "not governed".

use prometheus::{IntGaugeVec, Opts, Registry};

use crate::models::RootPolicyId;

/// Sentinel cluster namespace for root policies, which live outside any
/// cluster namespace.
pub const NO_CLUSTER_NAMESPACE: &str = "<null>";

/// Whether a gauge series describes a root or a replicated policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyType {
    Root,
    Propagated,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Root => "root",
            PolicyType::Propagated => "propagated",
        }
    }
}

/// Label set identifying one compliance gauge series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplianceLabels {
    pub policy_type: PolicyType,
    pub name: String,
    pub policy_namespace: String,
    pub cluster_namespace: String,
}

impl ComplianceLabels {
    /// Labels for a root policy.
    pub fn root(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::Root,
            name: name.into(),
            policy_namespace: namespace.into(),
            cluster_namespace: NO_CLUSTER_NAMESPACE.to_string(),
        }
    }

    /// Labels for a replicated policy in a cluster namespace.
    pub fn propagated(root: &RootPolicyId, cluster_namespace: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::Propagated,
            name: root.name.clone(),
            policy_namespace: root.namespace.clone(),
            cluster_namespace: cluster_namespace.into(),
        }
    }

    /// Values in registration order: type, name, policy_namespace,
    /// cluster_namespace.
    fn label_values(&self) -> [&str; 4] {
        [
            self.policy_type.as_str(),
            &self.name,
            &self.policy_namespace,
            &self.cluster_namespace,
        ]
    }
}

/// Metrics for policy governance.
pub struct PolicyMetrics {
    /// Compliance state per policy (0 = compliant, 1 = noncompliant)
    compliance_status: IntGaugeVec,
}

impl PolicyMetrics {
    /// Create and register policy metrics.
    pub fn new(registry: &Registry) -> Self {
        let compliance_status = IntGaugeVec::new(
            Opts::new(
                "policy_compliance_status",
                "Policy compliance (0 = compliant, 1 = noncompliant)",
            ),
            &["type", "name", "policy_namespace", "cluster_namespace"],
        )
        .expect("Failed to create policy_compliance_status metric");
        registry
            .register(Box::new(compliance_status.clone()))
            .expect("Failed to register policy_compliance_status");

        Self { compliance_status }
    }

    /// Ensure the series exists, creating it at 0 without assigning a value.
    pub fn touch(&self, labels: &ComplianceLabels) {
        self.compliance_status
            .with_label_values(&labels.label_values());
    }

    /// Set the compliance value for a series.
    pub fn set(&self, labels: &ComplianceLabels, value: i64) {
        self.compliance_status
            .with_label_values(&labels.label_values())
            .set(value);
    }

    /// Delete a series. Returns whether a series existed.
    pub fn remove(&self, labels: &ComplianceLabels) -> bool {
        self.compliance_status
            .remove_label_values(&labels.label_values())
            .is_ok()
    }
}
