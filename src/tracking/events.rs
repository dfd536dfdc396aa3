use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{PriceChange, StatusChange, TrackingResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrackingEvent {
    ListingSold(StatusChange),
    PriceChanged(PriceChange),
    CycleCompleted {
        checked: usize,
        errors: usize,
        timestamp: DateTime<Utc>,
    },
    CycleFailed {
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

pub struct EventBus {
    sender: broadcast::Sender<TrackingEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: TrackingEvent) {
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!("📡 Event published to {} receivers", receivers);
            }
            Err(_) => {
                // No subscribers right now.
            }
        }
    }

    /// Publishes every change of a finished cycle, then the cycle itself.
    pub fn publish_result(&self, result: &TrackingResult) {
        for change in &result.status_changes {
            self.publish(TrackingEvent::ListingSold(change.clone()));
        }
        for change in &result.price_changes {
            self.publish(TrackingEvent::PriceChanged(change.clone()));
        }
        self.publish(TrackingEvent::CycleCompleted {
            checked: result.checked,
            errors: result.errors.len(),
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackingEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::{ListingStatus, Platform};

    #[tokio::test]
    async fn test_result_is_published_in_order() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let result = TrackingResult {
            checked: 3,
            status_changes: vec![StatusChange {
                listing_id: "a".to_string(),
                title: "couch".to_string(),
                platform: Platform::Craigslist,
                old_status: ListingStatus::Listed,
                new_status: ListingStatus::Sold,
                detected_at: Utc::now(),
            }],
            ..TrackingResult::default()
        };
        bus.publish_result(&result);

        assert!(matches!(rx.recv().await.unwrap(), TrackingEvent::ListingSold(c) if c.listing_id == "a"));
        assert!(matches!(
            rx.recv().await.unwrap(),
            TrackingEvent::CycleCompleted { checked: 3, errors: 0, .. }
        ));
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.publish(TrackingEvent::CycleFailed {
            reason: "offline".to_string(),
            timestamp: Utc::now(),
        });
    }
}
