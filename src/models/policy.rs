//! Policy and governance API types for nomos.
//!
//! K_i: These types mirror the hub's multicluster governance conventions.
//! - Root policies live in ordinary namespaces.
//! - Replicated policies live in cluster namespaces, named
//!   `<root-namespace>.<root-name>` and labeled with the root-policy label.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label carried by replicated policies; value is `<namespace>.<name>` of
/// the owning root policy.
pub const ROOT_POLICY_LABEL: &str = "policy.nomos.dev/root-policy";

/// Label marking a policy as managed by this hub. Policies without it are
/// owned by the global hub and must be left alone.
pub const LOCAL_RESOURCE_LABEL: &str = "hub.nomos.dev/local-resource";

/// Policy custom resource.
///
/// The operator only reads policies; creation and replication are owned by
/// the propagation machinery.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "policy.nomos.dev",
    version = "v1",
    kind = "Policy",
    plural = "policies",
    shortname = "plc",
    namespaced,
    status = "PolicyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// Disabled policies are excluded from governance and from metrics
    #[serde(default)]
    pub disabled: bool,

    /// How violations should be handled on managed clusters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation_action: Option<RemediationAction>,
}

/// Remediation mode for a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum RemediationAction {
    /// Report violations without acting on them
    Inform,
    /// Actively correct violations
    Enforce,
}

/// Observed status of a policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyStatus {
    /// Compliance of this policy; for root policies this is the aggregate
    /// over all replicated copies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_state: Option<ComplianceState>,

    /// Per-cluster compliance breakdown (root policies only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub per_cluster: Vec<ClusterCompliance>,
}

/// Compliance reported by one replicated copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCompliance {
    /// Cluster namespace the replicated copy lives in
    pub cluster_namespace: String,

    /// Compliance reported by that copy, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_state: Option<ComplianceState>,
}

/// Compliance state of a policy.
///
/// K_i: Serialized exactly as `Compliant` / `NonCompliant` / `Pending`;
/// these strings are API contract, not display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ComplianceState {
    /// All evaluated checks pass
    Compliant,
    /// At least one evaluated check fails
    NonCompliant,
    /// Not yet evaluated
    Pending,
}

impl std::fmt::Display for ComplianceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComplianceState::Compliant => write!(f, "Compliant"),
            ComplianceState::NonCompliant => write!(f, "NonCompliant"),
            ComplianceState::Pending => write!(f, "Pending"),
        }
    }
}

/// Identity of a root policy, as encoded in the root-policy label value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootPolicyId {
    pub namespace: String,
    pub name: String,
}

impl RootPolicyId {
    /// Parse a `<namespace>.<name>` label value.
    ///
    /// Namespace names follow RFC 1123 and cannot contain `.`, so the split
    /// is on the first dot. Values with no dot or an empty half are
    /// malformed and yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let (namespace, name) = value.split_once('.')?;
        if namespace.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for RootPolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_policy_id_parse() {
        let id = RootPolicyId::parse("governance.require-limits").unwrap();
        assert_eq!(id.namespace, "governance");
        assert_eq!(id.name, "require-limits");
        assert_eq!(id.to_string(), "governance.require-limits");
    }

    #[test]
    fn test_root_policy_id_splits_on_first_dot() {
        // policy names may themselves contain dots
        let id = RootPolicyId::parse("governance.policy.v2").unwrap();
        assert_eq!(id.namespace, "governance");
        assert_eq!(id.name, "policy.v2");
    }

    #[test]
    fn test_root_policy_id_rejects_malformed() {
        assert!(RootPolicyId::parse("no-dot-here").is_none());
        assert!(RootPolicyId::parse(".name-only").is_none());
        assert!(RootPolicyId::parse("namespace-only.").is_none());
        assert!(RootPolicyId::parse("").is_none());
    }

    #[test]
    fn test_compliance_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&ComplianceState::NonCompliant).unwrap(),
            r#""NonCompliant""#
        );
        let state: ComplianceState = serde_json::from_str(r#""Compliant""#).unwrap();
        assert_eq!(state, ComplianceState::Compliant);
    }

    #[test]
    fn test_policy_status_wire_format() {
        let status = PolicyStatus {
            compliance_state: Some(ComplianceState::Compliant),
            per_cluster: vec![ClusterCompliance {
                cluster_namespace: "cluster-east".to_string(),
                compliance_state: Some(ComplianceState::Compliant),
            }],
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["complianceState"], "Compliant");
        assert_eq!(json["perCluster"][0]["clusterNamespace"], "cluster-east");
    }
}
