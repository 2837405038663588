//! Worker process binary: runs exactly one role in a loop until killed.
//! Draft preflight is not dispatched here — it's invoked synchronously by
//! the API on draft submission.

use clap::{Parser, ValueEnum};
use factory_store::{create_pool, DbConfig, Store};
use factory_worker::{logging, workers, GdriveOrigin, LocalOrigin, Origin, OriginBackend, QaPolicy, WorkerConfig};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Importer,
    Orchestrator,
    Qa,
    Uploader,
    Cleanup,
    TrackCatalog,
}

#[derive(Debug, Parser)]
#[command(name = "factory-worker")]
struct Cli {
    #[arg(long, value_enum)]
    role: Role,
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();
    logging::init_tracing();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();
    info!(role = ?cli.role, ?config, "starting factory-worker");

    let pool = match create_pool(DbConfig::sqlite(config.db_path.to_string_lossy())).await {
        Ok(pool) => pool,
        Err(e) => {
            error!(error = %e, "failed to open store");
            std::process::exit(1);
        }
    };
    let store = Store::new(pool);
    let worker_id = format!("{}-{}", role_name(cli.role), std::process::id());

    let origin: Box<dyn Origin> = match config.origin_backend {
        OriginBackend::Local => Box::new(LocalOrigin::new(config.origin_local_root.clone())),
        OriginBackend::Gdrive => Box::new(GdriveOrigin::new()),
    };
    let policy = QaPolicy::load(config.policies_path.as_deref());

    loop {
        let cycle_result = run_cycle(cli.role, &store, origin.as_ref(), &config, &policy, &worker_id).await;
        if let Err(e) = cycle_result {
            error!(role = ?cli.role, error = %e, "cycle failed");
        }
        tokio::time::sleep(config.worker_sleep()).await;
    }
}

async fn run_cycle(
    role: Role,
    store: &Store,
    origin: &dyn Origin,
    config: &WorkerConfig,
    policy: &QaPolicy,
    worker_id: &str,
) -> factory_worker::WorkerResult<()> {
    match role {
        Role::Importer => {
            let summary = workers::importer::run_once(store, origin).await?;
            if summary.releases_created > 0 || summary.promoted > 0 {
                info!(?summary, "importer cycle");
            }
        }
        Role::Orchestrator => {
            let outcome = workers::orchestrator::run_once(store, origin, config, worker_id).await?;
            if outcome != workers::orchestrator::OrchestratorOutcome::Idle {
                info!(?outcome, "orchestrator cycle");
            }
        }
        Role::Qa => {
            let outcome = workers::qa::run_once(store, config, policy, worker_id).await?;
            if outcome != workers::qa::QaOutcome::Idle {
                info!(?outcome, "qa cycle");
            }
        }
        Role::Uploader => {
            let outcome = workers::uploader::run_once(store, config, worker_id).await?;
            if outcome != workers::uploader::UploaderOutcome::Idle {
                info!(?outcome, "uploader cycle");
            }
        }
        Role::Cleanup => {
            let summary = workers::cleanup::run_once(store, config).await?;
            if summary.workspaces_removed > 0 || summary.mp4s_deleted > 0 {
                info!(?summary, "cleanup cycle");
            }
        }
        Role::TrackCatalog => {
            let summary = workers::track_catalog::run_once(store, origin).await?;
            if summary.tracks_catalogued > 0 {
                info!(?summary, "track-catalog cycle");
            }
        }
    }
    let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
    if let Err(e) = store
        .upsert_heartbeat(worker_id, role_name(role), std::process::id() as i64, &hostname, "")
        .await
    {
        warn!(error = %e, "heartbeat upsert failed");
    }
    Ok(())
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Importer => "importer",
        Role::Orchestrator => "orchestrator",
        Role::Qa => "qa",
        Role::Uploader => "uploader",
        Role::Cleanup => "cleanup",
        Role::TrackCatalog => "track_catalog",
    }
}
