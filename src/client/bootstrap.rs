//! Kubernetes client bootstrap.
//!
//! Epistemic foundation:
//! - K_i: In-cluster service accounts and kubeconfigs are the two ways in
//! - B_i: The API server is reachable (verified on first request, not here)
//! - I^R: An explicit kubeconfig path overrides inference

use crate::models::{KubeConfig, Result};
use kube::config::{Config as ClientConfig, KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::info;

/// Build a Kubernetes client from the operator configuration.
///
/// With an explicit kubeconfig path the client is built from that file;
/// otherwise the environment decides (in-cluster config first, then the
/// local default kubeconfig).
pub async fn build_client(config: &KubeConfig) -> Result<Client> {
    match config.kubeconfig_path() {
        Some(path) => {
            info!(path = %path.display(), "Using explicit kubeconfig");
            let kubeconfig = Kubeconfig::read_from(&path)?;
            let client_config =
                ClientConfig::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await?;
            Ok(Client::try_from(client_config)?)
        }
        None => Ok(Client::try_default().await?),
    }
}

/// Check whether a Kubernetes API error is a 404 for the requested object.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn test_is_not_found() {
        let not_found = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "policies \"missing\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        assert!(is_not_found(&not_found));

        let forbidden = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        assert!(!is_not_found(&forbidden));
    }
}
