//! nomos - Multicluster policy governance operator.
//!
//! ## Architecture
//!
//! nomos watches policy objects on a hub cluster and drives two reconcile
//! paths from a single watch stream:
//! - **Root status**: events on replicated policies are mapped back to the
//!   owning root policy, whose aggregate compliance is recomputed
//! - **Compliance metrics**: every policy keeps a Prometheus gauge series
//!   in lockstep with its compliance state
//!
//! Root policies live in ordinary namespaces; the propagation machinery
//! (external to this operator) replicates them into one namespace per
//! managed cluster as `<root-namespace>.<root-name>`.
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (types, enums)
//! - B_i (Beliefs): Runtime fallible operations (Result, Option)
//! - I^R (Resolvable): Operator-configurable parameters
//! - I^B (Bounded): API server uncertainties (requeue, watch restart)

pub mod client;
pub mod controller;
pub mod metrics;
pub mod models;

// Re-exports for convenience
pub use client::{build_client, is_in_cluster_namespace, ManagedCluster};
pub use controller::{ControllerRunner, ReconcileRequest, ReconcilerContext};
pub use metrics::MetricsRegistry;
pub use models::{ComplianceState, Config, NomosError, Policy, Result, RootPolicyId};
