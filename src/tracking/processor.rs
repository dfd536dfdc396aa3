use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::database::ListingRepository;
use super::types::{CheckOutcome, Listing, ListingStatus, PriceChange, StatusChange};
use crate::core::error::{Result, TrackerError};

/// Price moves at or below this many percent are noise.
pub const SIGNIFICANCE_THRESHOLD_PERCENT: i64 = 1;

/// Signed percent change of `new_price` against the `old_price` baseline.
pub fn percent_change(old_price: f64, new_price: f64) -> f64 {
    (new_price - old_price) * 100.0 / old_price
}

fn to_cents(price: f64) -> i128 {
    (price * 100.0).round() as i128
}

/// Whether moving from `old_price` to `new_price` clears the threshold.
///
/// Compared in whole cents: in floating point an exact 1% move such as
/// $70.00 to $70.70 comes out a hair above 1%.
pub fn is_significant(old_price: f64, new_price: f64) -> bool {
    let old = to_cents(old_price);
    let delta = (to_cents(new_price) - old).abs();
    delta * 100 > old * i128::from(SIGNIFICANCE_THRESHOLD_PERCENT)
}

fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{}\n{}", notes.trim_end(), line),
        _ => line.to_string(),
    }
}

/// Turns one listing's detector output into at most one persisted change.
pub struct ChangeProcessor {
    repository: Arc<dyn ListingRepository>,
    listing_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChangeProcessor {
    pub fn new(repository: Arc<dyn ListingRepository>) -> Self {
        Self {
            repository,
            listing_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Compares a fresh observation of a listing with its last known state.
    ///
    /// Sold wins over price: a sold listing only gets its status written.
    /// Otherwise a significant price move updates `asking_price` and appends
    /// a line to `notes`. At most one write happens per call, and calls for
    /// the same listing id never overlap.
    pub async fn process_check(
        &self,
        listing_id: &str,
        is_sold: bool,
        current_price: Option<f64>,
        current_asking_price: f64,
    ) -> Result<CheckOutcome> {
        let lock = self.lock_for(listing_id).await;
        let outcome = {
            let _guard = lock.lock().await;
            self.apply_check(listing_id, is_sold, current_price, current_asking_price)
                .await
        };
        self.release(listing_id, lock).await;
        outcome
    }

    async fn lock_for(&self, listing_id: &str) -> Arc<Mutex<()>> {
        self.listing_locks
            .lock()
            .await
            .entry(listing_id.to_string())
            .or_default()
            .clone()
    }

    async fn release(&self, listing_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.listing_locks.lock().await;
        // The map and this call hold the only references: nobody is waiting.
        let idle = Arc::strong_count(&lock) == 2;
        drop(lock);
        if idle {
            locks.remove(listing_id);
        }
    }

    async fn apply_check(
        &self,
        listing_id: &str,
        is_sold: bool,
        current_price: Option<f64>,
        current_asking_price: f64,
    ) -> Result<CheckOutcome> {
        let listing = self
            .repository
            .find_by_id(listing_id)
            .await?
            .ok_or_else(|| TrackerError::ListingNotFound(listing_id.to_string()))?;

        if listing.status.is_terminal() {
            tracing::debug!(
                "Listing {} is already {}, leaving it untouched",
                listing.id,
                listing.status
            );
            return Ok(CheckOutcome::default());
        }

        if is_sold {
            return self.mark_sold(&listing).await;
        }

        match current_price {
            Some(price) if price != current_asking_price => {
                self.apply_price(&listing, current_asking_price, price).await
            }
            _ => Ok(CheckOutcome::default()),
        }
    }

    async fn mark_sold(&self, listing: &Listing) -> Result<CheckOutcome> {
        self.repository
            .update_status(&listing.id, ListingStatus::Sold)
            .await?;

        tracing::info!(
            "🏷️  SOLD: {} [{}] ({} → {})",
            listing.title,
            listing.platform,
            listing.status,
            ListingStatus::Sold
        );

        Ok(CheckOutcome {
            status_change: Some(StatusChange {
                listing_id: listing.id.clone(),
                title: listing.title.clone(),
                platform: listing.platform,
                old_status: listing.status,
                new_status: ListingStatus::Sold,
                detected_at: Utc::now(),
            }),
            price_change: None,
        })
    }

    async fn apply_price(
        &self,
        listing: &Listing,
        old_price: f64,
        new_price: f64,
    ) -> Result<CheckOutcome> {
        let now = Utc::now();
        let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        // Without a usable baseline there is no percentage to judge; the
        // observed price becomes the baseline.
        if !(old_price.is_finite() && old_price > 0.0) {
            let notes = append_note(
                listing.notes.as_deref(),
                &format!("[{}] Price recorded: ${:.2}", stamp, new_price),
            );
            self.repository
                .update_price_and_notes(&listing.id, new_price, &notes)
                .await?;
            tracing::debug!("Recorded first price ${:.2} for {}", new_price, listing.id);
            return Ok(CheckOutcome::default());
        }

        let change_percent = percent_change(old_price, new_price);
        if !is_significant(old_price, new_price) {
            tracing::trace!(
                "Ignoring {:+.2}% move on {} (threshold {}%)",
                change_percent,
                listing.id,
                SIGNIFICANCE_THRESHOLD_PERCENT
            );
            return Ok(CheckOutcome::default());
        }

        let notes = append_note(
            listing.notes.as_deref(),
            &format!(
                "[{}] Price changed: ${:.2} → ${:.2}",
                stamp, old_price, new_price
            ),
        );
        self.repository
            .update_price_and_notes(&listing.id, new_price, &notes)
            .await?;

        tracing::info!(
            "💲 PRICE: {} [{}] ${:.2} → ${:.2} ({:+.1}%)",
            listing.title,
            listing.platform,
            old_price,
            new_price,
            change_percent
        );

        Ok(CheckOutcome {
            status_change: None,
            price_change: Some(PriceChange {
                listing_id: listing.id.clone(),
                title: listing.title.clone(),
                platform: listing.platform,
                old_price,
                new_price,
                change_percent,
                detected_at: now,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::database::tests::new_listing;
    use crate::tracking::database::{ListingDatabase, NewListing};
    use crate::tracking::types::Platform;

    async fn setup(listing: NewListing) -> (Arc<ListingDatabase>, ChangeProcessor, Listing) {
        let db = Arc::new(ListingDatabase::in_memory().await.unwrap());
        let listing = db.insert_listing(listing).await.unwrap();
        let processor = ChangeProcessor::new(db.clone());
        (db, processor, listing)
    }

    fn priced(price: f64) -> NewListing {
        NewListing {
            asking_price: price,
            ..new_listing("camera", Platform::Ebay, ListingStatus::Listed)
        }
    }

    #[test]
    fn test_threshold_boundary() {
        assert!(!is_significant(100.0, 101.0));
        assert!(!is_significant(100.0, 99.0));
        assert!(is_significant(100.0, 101.01));
        assert!(is_significant(100.0, 98.99));
        assert_eq!(percent_change(400.0, 350.0), -12.5);
    }

    #[test]
    fn test_exact_one_percent_is_noise_at_any_price() {
        let exact = [
            (70.0, 70.70),
            (19.0, 19.19),
            (7.0, 6.93),
            (7.0, 7.07),
            (1234.0, 1246.34),
            (2500.0, 2475.0),
        ];
        for (old, new) in exact {
            assert!(!is_significant(old, new), "{} -> {} counted as significant", old, new);
        }

        let just_over = [(70.0, 70.71), (19.0, 18.80), (7.0, 7.08)];
        for (old, new) in just_over {
            assert!(is_significant(old, new), "{} -> {} counted as noise", old, new);
        }
    }

    #[tokio::test]
    async fn test_exact_one_percent_leaves_listing_untouched() {
        for (old, new) in [(70.0, 70.70), (19.0, 19.19), (7.0, 6.93)] {
            let (db, processor, listing) = setup(priced(old)).await;

            let outcome = processor
                .process_check(&listing.id, false, Some(new), old)
                .await
                .unwrap();
            assert_eq!(outcome, CheckOutcome::default());

            let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
            assert_eq!(stored.asking_price, old);
            assert!(stored.notes.is_none());
        }
    }

    #[test]
    fn test_append_note_preserves_history() {
        assert_eq!(append_note(None, "b"), "b");
        assert_eq!(append_note(Some(""), "b"), "b");
        assert_eq!(append_note(Some("a\n"), "b"), "a\nb");
    }

    #[tokio::test]
    async fn test_sold_marks_listing() {
        let (db, processor, listing) = setup(priced(250.0)).await;

        let outcome = processor
            .process_check(&listing.id, true, Some(200.0), 250.0)
            .await
            .unwrap();

        let change = outcome.status_change.unwrap();
        assert_eq!(change.old_status, ListingStatus::Listed);
        assert_eq!(change.new_status, ListingStatus::Sold);
        // Sold takes priority; the price is not evaluated.
        assert!(outcome.price_change.is_none());

        let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Sold);
        assert_eq!(stored.asking_price, 250.0);
        assert!(stored.notes.is_none());
    }

    #[tokio::test]
    async fn test_sold_twice_is_recorded_once() {
        let (db, processor, listing) = setup(priced(250.0)).await;

        let first = processor
            .process_check(&listing.id, true, None, 250.0)
            .await
            .unwrap();
        let written_at = db.find_by_id(&listing.id).await.unwrap().unwrap().updated_at;

        let second = processor
            .process_check(&listing.id, true, None, 250.0)
            .await
            .unwrap();

        assert!(first.status_change.is_some());
        assert_eq!(second, CheckOutcome::default());
        let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, written_at);
    }

    #[tokio::test]
    async fn test_significant_drop_updates_price_and_notes() {
        let (db, processor, listing) = setup(NewListing {
            notes: Some("Seller says firm".to_string()),
            ..priced(400.0)
        })
        .await;

        let outcome = processor
            .process_check(&listing.id, false, Some(350.0), 400.0)
            .await
            .unwrap();

        let change = outcome.price_change.unwrap();
        assert_eq!(change.old_price, 400.0);
        assert_eq!(change.new_price, 350.0);
        assert!(change.change_percent < 0.0);
        assert!(outcome.status_change.is_none());

        let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(stored.asking_price, 350.0);
        let notes = stored.notes.unwrap();
        assert!(notes.starts_with("Seller says firm\n["));
        assert!(notes.ends_with("] Price changed: $400.00 → $350.00"));
        assert_eq!(stored.status, ListingStatus::Listed);
    }

    #[tokio::test]
    async fn test_small_moves_are_noise() {
        let (db, processor, listing) = setup(priced(100.0)).await;

        for price in [100.9, 101.0, 99.0] {
            let outcome = processor
                .process_check(&listing.id, false, Some(price), 100.0)
                .await
                .unwrap();
            assert_eq!(outcome, CheckOutcome::default());
        }

        let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(stored.asking_price, 100.0);
        assert!(stored.notes.is_none());
    }

    #[tokio::test]
    async fn test_just_over_threshold_is_recorded() {
        let (_db, processor, listing) = setup(priced(100.0)).await;

        let outcome = processor
            .process_check(&listing.id, false, Some(101.01), 100.0)
            .await
            .unwrap();
        assert!(outcome.price_change.is_some());
    }

    #[tokio::test]
    async fn test_unknown_price_changes_nothing() {
        let (db, processor, listing) = setup(priced(100.0)).await;

        let outcome = processor
            .process_check(&listing.id, false, None, 100.0)
            .await
            .unwrap();
        assert_eq!(outcome, CheckOutcome::default());
        assert_eq!(
            db.find_by_id(&listing.id).await.unwrap().unwrap().asking_price,
            100.0
        );
    }

    #[tokio::test]
    async fn test_zero_baseline_adopts_observed_price() {
        let (db, processor, listing) = setup(priced(0.0)).await;

        let outcome = processor
            .process_check(&listing.id, false, Some(80.0), 0.0)
            .await
            .unwrap();
        assert_eq!(outcome, CheckOutcome::default());

        let stored = db.find_by_id(&listing.id).await.unwrap().unwrap();
        assert_eq!(stored.asking_price, 80.0);
        assert!(stored.notes.unwrap().contains("Price recorded: $80.00"));
    }

    #[tokio::test]
    async fn test_terminal_listing_is_left_alone() {
        let (db, processor, listing) = setup(NewListing {
            status: ListingStatus::Passed,
            ..priced(100.0)
        })
        .await;

        let outcome = processor
            .process_check(&listing.id, false, Some(50.0), 100.0)
            .await
            .unwrap();
        assert_eq!(outcome, CheckOutcome::default());
        assert_eq!(
            db.find_by_id(&listing.id).await.unwrap().unwrap().asking_price,
            100.0
        );
    }

    #[tokio::test]
    async fn test_missing_listing_is_not_found() {
        let (_db, processor, _listing) = setup(priced(100.0)).await;

        let err = processor
            .process_check("deleted-id", true, None, 100.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ListingNotFound(id) if id == "deleted-id"));
    }

    #[tokio::test]
    async fn test_concurrent_checks_on_one_listing_write_once() {
        let (db, processor, listing) = setup(priced(300.0)).await;
        let processor = Arc::new(processor);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let processor = processor.clone();
                let id = listing.id.clone();
                tokio::spawn(async move { processor.process_check(&id, true, None, 300.0).await })
            })
            .collect();

        let mut sold = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().status_change.is_some() {
                sold += 1;
            }
        }

        assert_eq!(sold, 1);
        assert_eq!(
            db.find_by_id(&listing.id).await.unwrap().unwrap().status,
            ListingStatus::Sold
        );
        assert!(processor.listing_locks.lock().await.is_empty());
    }
}
