use std::time::Duration;

/// Errors raised by the tracking engine.
///
/// Only cycle-level variants (`CycleInProgress`, `CycleAborted`,
/// `CycleTimedOut`) and selector failures ever reach the caller of a
/// cycle. Everything else is caught per listing and folded into
/// `TrackingResult::errors`.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Listing not found: {0}")]
    ListingNotFound(String),

    #[error("Failed to fetch listing page")]
    EmptyPage,

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Listing check panicked: {0}")]
    CheckPanicked(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid listing record: {0}")]
    InvalidRecord(String),

    #[error("A tracking cycle is already running")]
    CycleInProgress,

    #[error("Tracking cycle aborted: {0}")]
    CycleAborted(String),

    #[error("Tracking cycle exceeded {0:?}")]
    CycleTimedOut(Duration),
}

pub type Result<T> = std::result::Result<T, TrackerError>;
