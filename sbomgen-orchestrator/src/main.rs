//! SBOM generation orchestrator binary
//!
//! Wires the engine together: database pool and migrations, leader election,
//! the admission scheduler and the reconciliation controller. The execution
//! backend is injected here; deployments adapt [`sbomgen_orchestrator::store::ExecutionBackend`]
//! to their job substrate.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sbomgen_orchestrator::config::Config;
use sbomgen_orchestrator::controller::ReconciliationController;
use sbomgen_orchestrator::db;
use sbomgen_orchestrator::factory::JobFactory;
use sbomgen_orchestrator::leader::PgLeaderElector;
use sbomgen_orchestrator::scheduler::AdmissionScheduler;
use sbomgen_orchestrator::store::{
    InMemoryExecutionBackend, PgManifestStore, PgRequestStore, PgWorkObjectStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sbomgen_orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting SBOM generation orchestrator");

    let config = load_config()?;
    info!(
        "Loaded configuration: instance_id={}, cap={}, batch={}",
        config.instance_id, config.max_concurrent_generations, config.sync_batch
    );

    info!("Connecting to database");
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let requests = Arc::new(PgRequestStore::new(pool.clone()));
    let work_objects = Arc::new(PgWorkObjectStore::new(pool.clone()));
    let manifests = Arc::new(PgManifestStore::new(pool.clone()));

    // Stand-in backend until a job substrate adapter is configured; jobs
    // submitted here are visible but never run.
    let backend = Arc::new(InMemoryExecutionBackend::new());

    let elector = Arc::new(PgLeaderElector::new(
        pool.clone(),
        config.instance_id.clone(),
        config.leader_lease,
    ));

    let scheduler = AdmissionScheduler::new(
        config.clone(),
        requests.clone(),
        work_objects.clone(),
        elector.clone(),
    );

    let controller = ReconciliationController::new(
        work_objects,
        backend,
        manifests,
        requests,
        JobFactory::from_config(&config),
        config.reconcile_interval,
    );

    info!("Orchestrator initialized successfully");

    let elector_handle = tokio::spawn({
        let elector = elector.clone();
        async move { elector.run().await }
    });

    let scheduler_handle = tokio::spawn(async move { scheduler.run().await });

    // The controller runs in the foreground; the loops never return under
    // normal operation.
    controller.run().await;

    elector_handle.abort();
    scheduler_handle.abort();
    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(_) => {
            info!("Failed to load config from environment, using defaults");
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}
