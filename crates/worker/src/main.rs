use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roster_db::{PgRosterStore, PgWorkQueue};
use roster_worker::{WorkerConfig, WorkerPool};

/// Grace period for in-flight deliveries on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roster_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        concurrency = config.concurrency,
        lease_secs = config.job_lease.as_secs(),
        max_attempts = config.max_attempts,
        "Loaded worker configuration",
    );

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = roster_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    roster_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let cancel = CancellationToken::new();
    let workers = WorkerPool::spawn(
        &config,
        Arc::new(PgWorkQueue::new(pool.clone())),
        Arc::new(PgRosterStore::new(pool)),
        cancel.clone(),
    );

    shutdown_signal().await?;
    workers.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to install Ctrl-C handler")?;
                tracing::info!("Received SIGINT (Ctrl-C), stopping workers");
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, stopping workers");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to install Ctrl-C handler")?;
        tracing::info!("Received SIGINT (Ctrl-C), stopping workers");
    }

    Ok(())
}
