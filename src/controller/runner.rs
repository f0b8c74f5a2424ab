//! Watch stream, queues, and reconcile workers.
//!
//! In-repo stand-in for a controller framework: one watch on policies fans
//! out to two queues, and a worker per queue drives the reconcile function.
//!
//! Epistemic foundation:
//! - K_i: Reconciles are idempotent, so the queues need no deduplication
//! - B_i: A reconcile may fail → retryable failures are re-enqueued after
//!   a backoff, everything else is logged and dropped
//! - I^B: The watch stream breaks at any time → the watcher restarts it

use crate::models::{ControllerConfig, NomosError, Policy, Result};
use futures::{StreamExt, TryStreamExt};
use kube::runtime::watcher;
use kube::Api;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::{compliance, mapper, status, ReconcileRequest, ReconcilerContext};

/// Drives the policy watch and both reconcile workers.
pub struct ControllerRunner {
    ctx: Arc<ReconcilerContext>,
    settings: ControllerConfig,
    /// Namespace restriction for the policy watch (all when unset)
    namespace: Option<String>,
}

impl ControllerRunner {
    /// Create a new runner.
    pub fn new(
        ctx: Arc<ReconcilerContext>,
        settings: ControllerConfig,
        namespace: Option<String>,
    ) -> Self {
        Self {
            ctx,
            settings,
            namespace,
        }
    }

    /// Run until the shutdown signal flips.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let capacity = self.settings.queue_capacity;
        let backoff = self.settings.error_backoff();

        let (status_tx, status_rx) = mpsc::channel(capacity);
        let (metrics_tx, metrics_rx) = mpsc::channel(capacity);

        // Workers stop on this signal, not on channel closure: their requeue
        // sender keeps their own queue open.
        let (stop_tx, stop_rx) = watch::channel(false);

        let status_worker = tokio::spawn(run_worker(
            "root-status",
            Arc::clone(&self.ctx),
            status_rx,
            status_tx.clone(),
            backoff,
            stop_rx.clone(),
            status::reconcile_root_policy,
        ));
        let metrics_worker = tokio::spawn(run_worker(
            "compliance-metrics",
            Arc::clone(&self.ctx),
            metrics_rx,
            metrics_tx.clone(),
            backoff,
            stop_rx,
            compliance::reconcile_compliance,
        ));

        let watch_result = self.watch_policies(&status_tx, &metrics_tx, shutdown).await;

        let _ = stop_tx.send(true);
        drop(status_tx);
        drop(metrics_tx);
        if status_worker.await.is_err() {
            error!(worker = "root-status", "Worker panicked");
        }
        if metrics_worker.await.is_err() {
            error!(worker = "compliance-metrics", "Worker panicked");
        }

        watch_result
    }

    /// Watch policies and dispatch every object event to both queues.
    async fn watch_policies(
        &self,
        status_tx: &mpsc::Sender<ReconcileRequest>,
        metrics_tx: &mpsc::Sender<ReconcileRequest>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let api: Api<Policy> = match &self.namespace {
            Some(namespace) => Api::namespaced(self.ctx.client.clone(), namespace),
            None => Api::all(self.ctx.client.clone()),
        };

        let mut stream = watcher(api, watcher::Config::default()).boxed();
        info!(namespace = self.namespace.as_deref().unwrap_or("*"), "Watching policies");

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("Shutting down policy watch");
                    return Ok(());
                }
                event = stream.try_next() => match event {
                    Ok(Some(event)) => self.dispatch(event, status_tx, metrics_tx).await,
                    Ok(None) => {
                        warn!("Policy watch stream ended");
                        return Err(NomosError::StreamClosed);
                    }
                    Err(err) => {
                        // The watcher re-establishes the watch on its own.
                        warn!(error = %err, "Watch stream error, continuing");
                    }
                }
            }
        }
    }

    async fn dispatch(
        &self,
        event: watcher::Event<Policy>,
        status_tx: &mpsc::Sender<ReconcileRequest>,
        metrics_tx: &mpsc::Sender<ReconcileRequest>,
    ) {
        match event {
            watcher::Event::Applied(policy) | watcher::Event::Deleted(policy) => {
                self.handle_policy(&policy, status_tx, metrics_tx).await;
            }
            watcher::Event::Restarted(policies) => {
                debug!(count = policies.len(), "Watch restarted, resyncing");
                for policy in &policies {
                    self.handle_policy(policy, status_tx, metrics_tx).await;
                }
            }
        }
    }

    async fn handle_policy(
        &self,
        policy: &Policy,
        status_tx: &mpsc::Sender<ReconcileRequest>,
        metrics_tx: &mpsc::Sender<ReconcileRequest>,
    ) {
        let Some(request) = ReconcileRequest::for_object(policy) else {
            return;
        };
        debug!(request = %request, "Policy event");

        // The compliance gauge tracks every policy object by its own name.
        if metrics_tx.send(request.clone()).await.is_err() {
            warn!(request = %request, "Compliance queue closed, dropping event");
        }

        // The status reconciler only sees events that map to a root policy.
        match mapper::map_policy_event(&self.ctx, policy).await {
            Ok(Some(root)) => {
                if status_tx.send(root).await.is_err() {
                    warn!(request = %request, "Status queue closed, dropping event");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(request = %request, error = %err, "Failed to map policy event");
            }
        }
    }
}

/// Consume one queue, re-enqueueing retryable failures after a backoff.
async fn run_worker<F, Fut>(
    name: &'static str,
    ctx: Arc<ReconcilerContext>,
    mut rx: mpsc::Receiver<ReconcileRequest>,
    tx: mpsc::Sender<ReconcileRequest>,
    backoff: Duration,
    mut stop: watch::Receiver<bool>,
    reconcile: F,
) where
    F: Fn(Arc<ReconcilerContext>, ReconcileRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    loop {
        let request = tokio::select! {
            _ = stop.changed() => break,
            request = rx.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        if let Err(err) = reconcile(Arc::clone(&ctx), request.clone()).await {
            if err.is_retryable() {
                warn!(
                    worker = name,
                    request = %request,
                    error = %err,
                    backoff_secs = backoff.as_secs(),
                    "Reconcile failed, going to retry"
                );
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(backoff).await;
                    let _ = tx.send(request).await;
                });
            } else {
                error!(
                    worker = name,
                    request = %request,
                    error = %err,
                    "Reconcile failed, dropping request"
                );
            }
        }
    }
    debug!(worker = name, "Worker stopped");
}
