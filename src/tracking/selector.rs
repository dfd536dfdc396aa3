use std::sync::Arc;

use super::database::ListingRepository;
use super::types::{ListingStatus, TrackableListing};
use crate::core::error::Result;

/// Reads every listing still worth re-checking, one keyset page at a time.
pub struct TrackableListingSelector {
    repository: Arc<dyn ListingRepository>,
    batch_size: usize,
}

impl TrackableListingSelector {
    pub fn new(repository: Arc<dyn ListingRepository>, batch_size: usize) -> Self {
        Self {
            repository,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn get_trackable_listings(&self) -> Result<Vec<TrackableListing>> {
        let mut listings = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .repository
                .find_by_statuses(&ListingStatus::TRACKABLE, cursor.as_deref(), self.batch_size)
                .await?;
            let page_len = page.len();
            cursor = page.last().map(|listing| listing.id.clone());

            listings.extend(
                page.into_iter()
                    .filter(|listing| listing.status.is_trackable())
                    .map(TrackableListing::from),
            );

            if page_len < self.batch_size {
                break;
            }
        }

        tracing::debug!(
            "📋 Selected {} trackable listings (batch size {})",
            listings.len(),
            self.batch_size
        );

        Ok(listings)
    }
}
