use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::TrackerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Craigslist,
    Facebook,
    Ebay,
    Mercari,
    Offerup,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Craigslist,
        Platform::Facebook,
        Platform::Ebay,
        Platform::Mercari,
        Platform::Offerup,
        Platform::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Craigslist => "CRAIGSLIST",
            Platform::Facebook => "FACEBOOK",
            Platform::Ebay => "EBAY",
            Platform::Mercari => "MERCARI",
            Platform::Offerup => "OFFERUP",
            Platform::Other => "OTHER",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TrackerError::InvalidRecord(format!("unknown platform '{}'", s)))
    }
}

/// Lifecycle state of a listing.
///
/// `Sold`, `Expired` and `Passed` are terminal: the selector never returns
/// listings in those states and the engine never mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    New,
    Analyzing,
    Opportunity,
    Contacted,
    Purchased,
    Listed,
    Sold,
    Expired,
    Passed,
}

impl ListingStatus {
    pub const TRACKABLE: [ListingStatus; 6] = [
        ListingStatus::New,
        ListingStatus::Analyzing,
        ListingStatus::Opportunity,
        ListingStatus::Contacted,
        ListingStatus::Purchased,
        ListingStatus::Listed,
    ];

    pub const TERMINAL: [ListingStatus; 3] = [
        ListingStatus::Sold,
        ListingStatus::Expired,
        ListingStatus::Passed,
    ];

    pub fn is_terminal(&self) -> bool {
        Self::TERMINAL.contains(self)
    }

    pub fn is_trackable(&self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::New => "NEW",
            ListingStatus::Analyzing => "ANALYZING",
            ListingStatus::Opportunity => "OPPORTUNITY",
            ListingStatus::Contacted => "CONTACTED",
            ListingStatus::Purchased => "PURCHASED",
            ListingStatus::Listed => "LISTED",
            ListingStatus::Sold => "SOLD",
            ListingStatus::Expired => "EXPIRED",
            ListingStatus::Passed => "PASSED",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::TRACKABLE
            .into_iter()
            .chain(Self::TERMINAL)
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TrackerError::InvalidRecord(format!("unknown status '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub platform: Platform,
    pub url: String,
    pub asking_price: f64,
    pub status: ListingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The fields of a listing a tracking cycle needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackableListing {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub platform: Platform,
    pub url: String,
    pub asking_price: f64,
    pub status: ListingStatus,
}

impl From<Listing> for TrackableListing {
    fn from(listing: Listing) -> Self {
        Self {
            id: listing.id,
            user_id: listing.user_id,
            title: listing.title,
            platform: listing.platform,
            url: listing.url,
            asking_price: listing.asking_price,
            status: listing.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub listing_id: String,
    pub title: String,
    pub platform: Platform,
    pub old_status: ListingStatus,
    pub new_status: ListingStatus,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChange {
    pub listing_id: String,
    pub title: String,
    pub platform: Platform,
    pub old_price: f64,
    pub new_price: f64,
    /// Signed, relative to `old_price`.
    pub change_percent: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingError {
    pub listing_id: String,
    pub message: String,
}

/// Outcome of one `process_check` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOutcome {
    pub status_change: Option<StatusChange>,
    pub price_change: Option<PriceChange>,
}

/// Aggregate of one tracking cycle. Only ever handed out complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingResult {
    pub checked: usize,
    pub status_changes: Vec<StatusChange>,
    pub price_changes: Vec<PriceChange>,
    pub errors: Vec<ListingError>,
}

impl TrackingResult {
    pub fn has_changes(&self) -> bool {
        !self.status_changes.is_empty() || !self.price_changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_partitions_are_disjoint_and_complete() {
        for status in ListingStatus::TRACKABLE {
            assert!(status.is_trackable());
            assert!(!ListingStatus::TERMINAL.contains(&status));
        }
        for status in ListingStatus::TERMINAL {
            assert!(status.is_terminal());
        }
    }

    #[test]
    fn test_status_parse_is_case_insensitive() {
        assert_eq!("sold".parse::<ListingStatus>().unwrap(), ListingStatus::Sold);
        assert_eq!(" Listed ".parse::<ListingStatus>().unwrap(), ListingStatus::Listed);
        assert!("GONE".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn test_platform_round_trips_through_display() {
        for platform in Platform::ALL {
            assert_eq!(platform.to_string().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!("ebay".parse::<Platform>().unwrap(), Platform::Ebay);
    }

    #[test]
    fn test_serde_uses_screaming_case() {
        let json = serde_json::to_string(&ListingStatus::Opportunity).unwrap();
        assert_eq!(json, "\"OPPORTUNITY\"");
        let json = serde_json::to_string(&Platform::Offerup).unwrap();
        assert_eq!(json, "\"OFFERUP\"");
    }
}
