//! Listing tracking and change detection for marketplace flips.
//!
//! A tracking cycle re-checks every listing that has not reached a terminal
//! state, detects sold listings and significant price moves from the raw
//! page content, and persists those changes one listing at a time.

pub mod core;
pub mod tracking;
