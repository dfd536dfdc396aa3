pub mod database;
pub mod detector;
pub mod events;
pub mod fetcher;
pub mod heuristics;
pub mod metrics;
pub mod orchestrator;
pub mod price;
pub mod processor;
pub mod reporter;
pub mod scheduler;
pub mod selector;
pub mod types;

pub use database::{ListingDatabase, ListingRepository, ListingStatistics, NewListing};
pub use detector::is_sold;
pub use events::{EventBus, TrackingEvent};
pub use fetcher::{FnPageFetcher, HttpPageFetcher, PageFetcher};
pub use metrics::TrackingMetrics;
pub use orchestrator::TrackingOrchestrator;
pub use price::extract_price;
pub use processor::{ChangeProcessor, SIGNIFICANCE_THRESHOLD_PERCENT};
pub use scheduler::TrackingScheduler;
pub use selector::TrackableListingSelector;
pub use types::{
    CheckOutcome, Listing, ListingError, ListingStatus, Platform, PriceChange, StatusChange,
    TrackableListing, TrackingResult,
};
