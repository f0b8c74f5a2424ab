//! Error types for nomos.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (invalid config, malformed objects)
//! - I^B materialized: Infrastructure failures (API server, watch stream)
//! - K_i violated: Internal invariant violations (bugs)

use thiserror::Error;

/// Top-level error type for nomos.
#[derive(Debug, Error)]
pub enum NomosError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("Watch stream error: {0}")]
    Watch(#[from] kube::runtime::watcher::Error),

    #[error("Metrics endpoint error: {context}")]
    Metrics {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Policy watch stream closed unexpectedly")]
    StreamClosed,
}

impl NomosError {
    /// Create a metrics endpoint error with context.
    pub fn metrics(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Metrics {
            context: context.into(),
            source,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Retryable errors cause the offending request to be re-enqueued after
    /// a backoff; everything else is logged and dropped.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Kube(_) | Self::Watch(_))
    }
}

/// Result type alias for nomos.
pub type Result<T> = std::result::Result<T, NomosError>;
