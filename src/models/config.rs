//! Configuration models for nomos.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The operator resolves these unknowns at startup via config file.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for nomos.
///
/// I^R resolved: All configurable parameters are explicit. Every section
/// and every field has a default, so an absent config file yields a
/// fully-working in-cluster setup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Kubernetes client configuration
    #[serde(default)]
    pub kube: KubeConfig,

    /// Reconcile loop configuration
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Metrics endpoint configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Kubernetes client configuration.
///
/// B_i: When no kubeconfig is given, the client is inferred from the
/// environment (in-cluster service account, then local kubeconfig).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KubeConfig {
    /// Explicit kubeconfig path (supports ${ENV_VAR} expansion)
    #[serde(default)]
    pub kubeconfig: Option<String>,

    /// Namespace to watch for policies (all namespaces when unset)
    #[serde(default)]
    pub namespace: Option<String>,
}

impl KubeConfig {
    /// Resolve the kubeconfig path, expanding environment variables.
    pub fn kubeconfig_path(&self) -> Option<PathBuf> {
        self.kubeconfig
            .as_deref()
            .map(|raw| PathBuf::from(expand_env_vars(raw)))
    }
}

/// Reconcile loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Capacity of each reconcile queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Delay before a failed request is re-enqueued, in seconds
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
}

fn default_queue_capacity() -> usize {
    256
}

fn default_error_backoff() -> u64 {
    30
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            error_backoff_secs: default_error_backoff(),
        }
    }
}

impl ControllerConfig {
    /// Backoff applied before re-enqueueing a failed request.
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Listen address for the /metrics endpoint
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8383".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })
    }

    /// Resolve the metrics listen address.
    ///
    /// B_i(address is well-formed) → Result
    pub fn metrics_listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let expanded = expand_env_vars(&self.metrics.listen_addr);
        expanded
            .parse()
            .map_err(|e| ConfigError::InvalidListenAddr {
                value: expanded,
                source: e,
            })
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - I^B materialized: Malformed values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid metrics listen address '{value}': {source}")]
    InvalidListenAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.controller.queue_capacity, 256);
        assert_eq!(config.controller.error_backoff_secs, 30);
        assert_eq!(config.metrics.listen_addr, "0.0.0.0:8383");
        assert!(config.kube.kubeconfig.is_none());
        assert!(config.kube.namespace.is_none());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[kube]
namespace = "policies"

[controller]
error_backoff_secs = 5

[metrics]
listen_addr = "127.0.0.1:9099"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.kube.namespace.as_deref(), Some("policies"));
        assert_eq!(config.controller.error_backoff(), Duration::from_secs(5));
        // untouched sections keep their defaults
        assert_eq!(config.controller.queue_capacity, 256);
        assert_eq!(
            config.metrics_listen_addr().unwrap(),
            "127.0.0.1:9099".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/nomos.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn test_invalid_listen_addr() {
        let config = Config {
            metrics: MetricsConfig {
                listen_addr: "not-an-addr".to_string(),
            },
            ..Config::default()
        };
        assert!(matches!(
            config.metrics_listen_addr(),
            Err(ConfigError::InvalidListenAddr { .. })
        ));
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("NOMOS_TEST_HOME", "/home/nomos");
        assert_eq!(
            expand_env_vars("${NOMOS_TEST_HOME}/.kube/config"),
            "/home/nomos/.kube/config"
        );
        // unset variables are left as-is
        assert_eq!(
            expand_env_vars("${NOMOS_TEST_UNSET_VAR}/x"),
            "${NOMOS_TEST_UNSET_VAR}/x"
        );
    }
}
