use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::time::Duration;

use super::types::TrackingResult;

pub struct TrackingMetrics {
    registry: Registry,
    cycles_total: IntCounter,
    cycles_failed_total: IntCounter,
    listings_checked_total: IntCounter,
    status_changes_total: IntCounter,
    price_changes_total: IntCounter,
    listing_errors_total: IntCounter,
    cycle_duration_seconds: Histogram,
}

impl TrackingMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("flip_tracker".to_string()), None)?;

        let counter = |name: &str, help: &str| -> prometheus::Result<IntCounter> {
            let counter = IntCounter::new(name, help)?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        let cycles_total = counter("cycles_total", "Completed tracking cycles")?;
        let cycles_failed_total =
            counter("cycles_failed_total", "Tracking cycles that returned an error")?;
        let listings_checked_total =
            counter("listings_checked_total", "Listings fetched and processed")?;
        let status_changes_total =
            counter("status_changes_total", "Listings detected as sold")?;
        let price_changes_total =
            counter("price_changes_total", "Significant price changes recorded")?;
        let listing_errors_total =
            counter("listing_errors_total", "Per-listing failures inside cycles")?;

        let cycle_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("cycle_duration_seconds", "Wall time of a tracking cycle")
                .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
        )?;
        registry.register(Box::new(cycle_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            cycles_total,
            cycles_failed_total,
            listings_checked_total,
            status_changes_total,
            price_changes_total,
            listing_errors_total,
            cycle_duration_seconds,
        })
    }

    pub fn record_cycle(&self, result: &TrackingResult, elapsed: Duration) {
        self.cycles_total.inc();
        self.listings_checked_total.inc_by(result.checked as u64);
        self.status_changes_total
            .inc_by(result.status_changes.len() as u64);
        self.price_changes_total
            .inc_by(result.price_changes.len() as u64);
        self.listing_errors_total.inc_by(result.errors.len() as u64);
        self.cycle_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn record_failed_cycle(&self, elapsed: Duration) {
        self.cycles_failed_total.inc();
        self.cycle_duration_seconds.observe(elapsed.as_secs_f64());
    }

    pub fn cycles_total(&self) -> u64 {
        self.cycles_total.get()
    }

    pub fn cycles_failed_total(&self) -> u64 {
        self.cycles_failed_total.get()
    }

    /// Prometheus text exposition of every tracking metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("❌ Failed to encode metrics: {}", e);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
