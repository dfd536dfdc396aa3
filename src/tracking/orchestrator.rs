use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use super::database::ListingRepository;
use super::detector::is_sold;
use super::fetcher::PageFetcher;
use super::price::extract_price;
use super::processor::ChangeProcessor;
use super::selector::TrackableListingSelector;
use super::types::{CheckOutcome, ListingError, TrackableListing, TrackingResult};
use crate::core::config::TrackingConfig;
use crate::core::error::{Result, TrackerError};

/// Drives tracking cycles over every trackable listing.
///
/// Listings are checked on a bounded set of tasks; a failure on one
/// listing becomes an entry in `TrackingResult::errors` and never stops the
/// rest of the batch. Only one cycle runs at a time per orchestrator.
pub struct TrackingOrchestrator {
    selector: TrackableListingSelector,
    processor: Arc<ChangeProcessor>,
    max_concurrent_checks: usize,
    cycle_timeout: Option<Duration>,
    cycle_lock: Mutex<()>,
}

impl TrackingOrchestrator {
    pub fn new(repository: Arc<dyn ListingRepository>, config: &TrackingConfig) -> Self {
        Self {
            selector: TrackableListingSelector::new(repository.clone(), config.selector_batch_size),
            processor: Arc::new(ChangeProcessor::new(repository)),
            max_concurrent_checks: config.max_concurrent_checks.max(1),
            cycle_timeout: (config.cycle_timeout_secs > 0).then(|| config.cycle_timeout()),
            cycle_lock: Mutex::new(()),
        }
    }

    pub async fn run_tracking_cycle(&self, fetcher: Arc<dyn PageFetcher>) -> Result<TrackingResult> {
        self.run_tracking_cycle_until(fetcher, std::future::pending::<()>())
            .await
    }

    /// Runs one cycle, giving up when `shutdown` resolves first.
    ///
    /// An aborted or timed-out cycle yields an error and nothing else: the
    /// changes already persisted stay, but no partial result is returned.
    /// Checks still in flight are cancelled.
    pub async fn run_tracking_cycle_until<S>(
        &self,
        fetcher: Arc<dyn PageFetcher>,
        shutdown: S,
    ) -> Result<TrackingResult>
    where
        S: Future<Output = ()>,
    {
        let _cycle = self
            .cycle_lock
            .try_lock()
            .map_err(|_| TrackerError::CycleInProgress)?;

        let bounded = async {
            match self.cycle_timeout {
                Some(limit) => tokio::time::timeout(limit, self.execute_cycle(fetcher))
                    .await
                    .map_err(|_| TrackerError::CycleTimedOut(limit))?,
                None => self.execute_cycle(fetcher).await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = shutdown => {
                tracing::warn!("⏹️  Tracking cycle aborted by shutdown signal");
                Err(TrackerError::CycleAborted("shutdown requested".to_string()))
            }
        }
    }

    async fn execute_cycle(&self, fetcher: Arc<dyn PageFetcher>) -> Result<TrackingResult> {
        let started = Instant::now();

        let selected = self.selector.get_trackable_listings().await?;
        let mut seen = HashSet::new();
        let candidates: Vec<TrackableListing> = selected
            .into_iter()
            .filter(|listing| seen.insert(listing.id.clone()))
            .collect();

        tracing::info!(
            "🔍 Tracking cycle started: {} listings, {} workers",
            candidates.len(),
            self.max_concurrent_checks
        );

        // Dropping the set aborts every check still running.
        let permits = Arc::new(Semaphore::new(self.max_concurrent_checks));
        let mut checks = JoinSet::new();
        for (index, listing) in candidates.iter().cloned().enumerate() {
            let fetcher = fetcher.clone();
            let processor = self.processor.clone();
            let permits = permits.clone();
            checks.spawn(async move {
                let _permit = permits.acquire().await;
                let outcome = AssertUnwindSafe(check_listing(fetcher.as_ref(), &processor, &listing))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(TrackerError::CheckPanicked(panic_message(panic))));
                (index, outcome)
            });
        }

        let mut outcomes: Vec<(usize, Result<CheckOutcome>)> = Vec::with_capacity(candidates.len());
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("❌ Listing check task failed: {}", e),
            }
        }

        // Completion order is arbitrary; report in selection order.
        outcomes.sort_by_key(|(index, _)| *index);

        let mut result = TrackingResult::default();
        for (index, outcome) in outcomes {
            let listing = &candidates[index];
            match outcome {
                Ok(check) => {
                    result.checked += 1;
                    result.status_changes.extend(check.status_change);
                    result.price_changes.extend(check.price_change);
                }
                Err(e) => {
                    tracing::warn!("⚠️  Listing {} ({}) check failed: {}", listing.id, listing.url, e);
                    result.errors.push(ListingError {
                        listing_id: listing.id.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "✅ Tracking cycle finished in {:.2}s: {} checked, {} sold, {} price changes, {} errors",
            started.elapsed().as_secs_f64(),
            result.checked,
            result.status_changes.len(),
            result.price_changes.len(),
            result.errors.len()
        );

        Ok(result)
    }
}

async fn check_listing(
    fetcher: &dyn PageFetcher,
    processor: &ChangeProcessor,
    listing: &TrackableListing,
) -> Result<CheckOutcome> {
    let fetched = fetcher.fetch_page(&listing.url).await;
    let page = match fetched {
        Ok(Some(page)) if !page.trim().is_empty() => page,
        Ok(_) => return Err(TrackerError::EmptyPage),
        Err(e) => {
            return Err(TrackerError::FetchFailed {
                url: listing.url.clone(),
                reason: format!("{:#}", e),
            })
        }
    };

    let sold = is_sold(&page, listing.platform);
    let price = extract_price(&page, listing.platform);
    tracing::debug!(
        "Checked {} [{}]: sold={} price={:?}",
        listing.id,
        listing.platform,
        sold,
        price
    );

    processor
        .process_check(&listing.id, sold, price, listing.asking_price)
        .await
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
