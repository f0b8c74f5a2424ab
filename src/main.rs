//! nomos CLI - Multicluster policy governance operator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nomos::{
    build_client, Config, ControllerRunner, MetricsRegistry, ReconcilerContext,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "nomos")]
#[command(author = "Infernet <dev@infernet.org>")]
#[command(version)]
#[command(about = "Multicluster policy governance operator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the operator (policy watch, reconcilers, metrics endpoint)
    Run,

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# nomos configuration file

[kube]
# Explicit kubeconfig (inferred from the environment when omitted)
# kubeconfig = "${HOME}/.kube/config"
# Watch a single namespace instead of all namespaces
# namespace = "governance"

[controller]
queue_capacity = 256
error_backoff_secs = 30

[metrics]
listen_addr = "0.0.0.0:8383"
"#;
    println!("{example}");
}

/// Load the config file, falling back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
    } else {
        info!(path = %path.display(), "No config file found, using defaults");
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = Config::from_file(&cli.config)
                .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

            let addr = config
                .metrics_listen_addr()
                .context("Failed to resolve metrics listen address")?;

            info!("Configuration is valid");
            info!(
                "  Watching: {}",
                config.kube.namespace.as_deref().unwrap_or("all namespaces")
            );
            info!("  Metrics:  {addr}");
            info!(
                "  Requeue:  {}s after retryable failures",
                config.controller.error_backoff_secs
            );
            return Ok(());
        }

        Commands::Run => {
            let config = load_config(&cli.config)?;

            let addr = config
                .metrics_listen_addr()
                .context("Failed to resolve metrics listen address")?;

            let client = build_client(&config.kube)
                .await
                .context("Failed to build Kubernetes client")?;

            let registry = Arc::new(MetricsRegistry::new());
            let ctx = Arc::new(ReconcilerContext::new(client, Arc::clone(&registry)));
            let runner = ControllerRunner::new(
                ctx,
                config.controller.clone(),
                config.kube.namespace.clone(),
            );

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            });

            info!("Starting nomos");
            tokio::try_join!(
                runner.run(shutdown_rx.clone()),
                nomos::metrics::serve(addr, Arc::clone(&registry), shutdown_rx),
            )?;
            info!("Stopped");
        }
    }

    Ok(())
}
