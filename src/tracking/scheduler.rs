use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::events::{EventBus, TrackingEvent};
use super::fetcher::PageFetcher;
use super::metrics::TrackingMetrics;
use super::orchestrator::TrackingOrchestrator;
use super::reporter::format_cycle_report;
use super::types::TrackingResult;
use crate::core::error::Result;
use crate::core::health::{CycleSummary, HealthChecker};

/// Runs a tracking cycle on every interval tick until told to stop.
pub struct TrackingScheduler {
    orchestrator: Arc<TrackingOrchestrator>,
    fetcher: Arc<dyn PageFetcher>,
    events: Arc<EventBus>,
    metrics: Arc<TrackingMetrics>,
    health: HealthChecker,
    interval: Duration,
}

/// Resolves once the watch value turns true. A dropped sender never fires.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

impl TrackingScheduler {
    pub fn new(
        orchestrator: Arc<TrackingOrchestrator>,
        fetcher: Arc<dyn PageFetcher>,
        events: Arc<EventBus>,
        metrics: Arc<TrackingMetrics>,
        health: HealthChecker,
        interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            fetcher,
            events,
            metrics,
            health,
            interval,
        }
    }

    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                "⏰ Tracking scheduler started (cycle every {}s)",
                self.interval.as_secs()
            );
            self.health.update_component("scheduler", true).await;

            let mut interval = tokio::time::interval(self.interval);
            // A cycle longer than the interval swallows the ticks it missed,
            // so cycles never queue up behind each other.
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                // Errors are already logged, counted and published.
                let _ = self.run_once(wait_for_shutdown(shutdown.clone())).await;

                if *shutdown.borrow() {
                    break;
                }
            }

            self.health.update_component("scheduler", false).await;
            tracing::info!("🛑 Tracking scheduler stopped");
        })
    }

    /// Runs a single cycle and fans its outcome out to the log, metrics,
    /// health state and event bus.
    pub async fn run_once<S>(&self, shutdown: S) -> Result<TrackingResult>
    where
        S: std::future::Future<Output = ()>,
    {
        let started = Instant::now();
        let outcome = self
            .orchestrator
            .run_tracking_cycle_until(self.fetcher.clone(), shutdown)
            .await;
        let elapsed = started.elapsed();

        match &outcome {
            Ok(result) => {
                tracing::info!("{}", format_cycle_report(result, elapsed));
                self.metrics.record_cycle(result, elapsed);
                self.events.publish_result(result);
                self.health
                    .record_cycle(CycleSummary {
                        finished_at: Utc::now(),
                        succeeded: true,
                        checked: result.checked,
                        status_changes: result.status_changes.len(),
                        price_changes: result.price_changes.len(),
                        errors: result.errors.len(),
                    })
                    .await;
            }
            Err(e) => {
                tracing::error!("❌ Tracking cycle failed: {}", e);
                self.metrics.record_failed_cycle(elapsed);
                self.events.publish(TrackingEvent::CycleFailed {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                self.health
                    .record_cycle(CycleSummary {
                        finished_at: Utc::now(),
                        succeeded: false,
                        checked: 0,
                        status_changes: 0,
                        price_changes: 0,
                        errors: 0,
                    })
                    .await;
            }
        }

        outcome
    }
}
