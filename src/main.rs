use anyhow::Result;
use flip_tracker::core::{logging, Config, HealthChecker};
use flip_tracker::tracking::{
    EventBus, HttpPageFetcher, ListingDatabase, PageFetcher, TrackingMetrics,
    TrackingOrchestrator, TrackingScheduler,
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    logging::init_logging(&config.monitoring.log_level);

    tracing::info!("🚀 Flip Tracker starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let health_checker = HealthChecker::new();

    let database = Arc::new(ListingDatabase::new(&config.database.url).await?);
    health_checker
        .update_component("database", database.ping().await)
        .await;

    let stats = database.get_statistics().await?;
    tracing::info!(
        "📦 {} listings on file, {} trackable",
        stats.total_listings,
        stats.trackable_listings
    );

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpPageFetcher::new(&config.fetcher)?);
    let orchestrator = Arc::new(TrackingOrchestrator::new(database.clone(), &config.tracking));
    let metrics = Arc::new(TrackingMetrics::new()?);
    let events = Arc::new(EventBus::new(256));

    let scheduler = Arc::new(TrackingScheduler::new(
        orchestrator,
        fetcher,
        events,
        metrics.clone(),
        health_checker.clone(),
        config.tracking.interval(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_handle = scheduler.start(shutdown_rx);

    // Start health and metrics endpoint
    let health_clone = health_checker.clone();
    let health_port = config.monitoring.health_port;
    tokio::spawn(async move { start_health_server(health_clone, metrics, health_port).await });

    tracing::info!("✅ Health endpoint running on port {}", health_port);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested, stopping tracker...");

    // The scheduler may already be gone if its task panicked.
    let _ = shutdown_tx.send(true);
    scheduler_handle.await?;

    Ok(())
}

async fn start_health_server(
    health_checker: HealthChecker,
    metrics: Arc<TrackingMetrics>,
    port: u16,
) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    let exposition = warp::path("metrics").map(move || metrics.render());

    warp::serve(health.or(exposition)).run(([0, 0, 0, 0], port)).await;
}
