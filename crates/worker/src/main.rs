use std::sync::Arc;
use std::time::Duration;

use aurora_events::{AlertDispatcher, EventBus, WebhookDelivery};
use aurora_pipeline::batch::BatchScheduler;
use aurora_pipeline::runner::AnalysisRunner;
use aurora_pipeline::source::{SceneFetcher, SyntheticSource};
use aurora_pipeline::store::PgAnalysisStore;
use aurora_worker::config::WorkerConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = WorkerConfig::from_env()?;
    init_tracing(config.json_logs);
    tracing::info!(
        interval_secs = config.analysis_interval_secs,
        source_max_retries = config.source_max_retries,
        source_timeout_secs = config.source_timeout_secs,
        report_window_days = config.report_window_days,
        "Loaded worker configuration"
    );

    // --- Database ---
    let pool = aurora_db::create_pool(&config.database_url).await?;
    aurora_db::health_check(&pool).await?;
    tracing::info!("Database health check passed");
    aurora_db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // --- Alerts ---
    let event_bus = Arc::new(EventBus::default());
    let dispatcher = AlertDispatcher::new(pool.clone(), WebhookDelivery::new());
    let dispatcher_handle = tokio::spawn(dispatcher.run(event_bus.subscribe()));

    // --- Analysis ---
    let store = Arc::new(PgAnalysisStore::new(pool.clone()));
    let fetcher = SceneFetcher::new(Arc::new(SyntheticSource), config.retry_policy());
    let mut runner = AnalysisRunner::new(store, fetcher, Arc::clone(&event_bus));
    if let Some(seed) = config.synthetic_seed {
        tracing::info!(seed, "Using fixed random seed");
        runner = runner.with_seed(seed);
    }
    let scheduler = BatchScheduler::new(Arc::new(runner)).with_early_warning(config.report_window_days);

    let cancel = CancellationToken::new();
    let scheduler_cancel = cancel.clone();
    let interval = config.analysis_interval();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run_periodic(interval, scheduler_cancel).await;
    });

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(30), scheduler_handle).await;
    tracing::info!("Analysis scheduler stopped");

    // Dropping the last bus handle closes the channel and stops the dispatcher.
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await;
    tracing::info!("Alert dispatcher stopped");

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "aurora_worker=debug,aurora_pipeline=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
