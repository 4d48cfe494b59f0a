//! VolSync restic Kubernetes Operator
//!
//! Main entry point for the operator. Loads configuration, sets up the
//! Kubernetes client and change-detection store, and runs the claim
//! controller alongside the metrics server.

use kube::Client;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use volsync_restic_operator::{
    adapters::{deployer::KubeDeployer, secrets::KubeSecretReader},
    config::OperatorConfig,
    controllers::{claim_controller, Context},
    metrics,
    namespace::NamespaceResolver,
    reconcilers::claim::ClaimReconciler,
    state::FileStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    info!("Starting VolSync restic operator");

    let config = OperatorConfig::from_env()?;

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    // Fail fast when the operator cannot tell where its source secret lives
    let namespaces = Arc::new(NamespaceResolver::standard());
    let operator_namespace = namespaces.resolve()?;
    info!(
        "Reading {} from namespace {}",
        config.source_secret_name, operator_namespace
    );

    let store = FileStore::open(&config.state_dir).await?;
    info!("Change-detection state in {}", store.root().display());

    // Claims deleted while the operator was down never reach the controller
    if let Err(e) = claim_controller::sweep_stale_records(&client, &store).await {
        warn!("Skipping stale change-detection sweep: {}", e);
    }

    let reconciler = ClaimReconciler::new(
        Arc::new(KubeSecretReader::new(client.clone())),
        Arc::new(KubeDeployer::new(client.clone(), config.replication.clone())),
        namespaces,
        config.source_secret_name.clone(),
    );
    let context = Context::new(client, Arc::new(store), reconciler);

    // Start metrics server
    let metrics_handle = tokio::spawn(metrics::serve(config.metrics_port));
    info!("Metrics server starting on port {}", config.metrics_port);

    // Run the claim controller
    let controller_handle = tokio::spawn(claim_controller::run(context));
    metrics::set_ready(true);

    // Handle graceful shutdown
    tokio::select! {
        _ = controller_handle => {
            error!("PersistentVolumeClaim controller exited unexpectedly");
        }
        _ = metrics_handle => {
            error!("Metrics server exited unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
        }
    }

    metrics::set_ready(false);
    info!("VolSync restic operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,volsync_restic_operator=debug,kube=warn,hyper=warn")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
