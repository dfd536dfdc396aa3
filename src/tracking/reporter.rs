use std::time::Duration;

use super::types::TrackingResult;

/// Boxed plain-text summary of a finished cycle, for the log.
pub fn format_cycle_report(result: &TrackingResult, elapsed: Duration) -> String {
    let mut output = String::new();

    output.push_str("\n╔══════════════════════════════════════════════════════════════════════╗\n");
    output.push_str("║             LISTING TRACKING CYCLE REPORT                            ║\n");
    output.push_str("╚══════════════════════════════════════════════════════════════════════╝\n\n");

    output.push_str(&format!(
        "📊 Checked: {} | 🏷️  Sold: {} | 💲 Price changes: {} | ⚠️  Errors: {} | ⏱️  {:.1}s\n\n",
        result.checked,
        result.status_changes.len(),
        result.price_changes.len(),
        result.errors.len(),
        elapsed.as_secs_f64()
    ));

    if !result.status_changes.is_empty() {
        output.push_str("🏷️  SOLD:\n");
        for change in &result.status_changes {
            output.push_str(&format!(
                "   • {} [{}] {} → {}\n",
                change.title, change.platform, change.old_status, change.new_status
            ));
        }
        output.push('\n');
    }

    if !result.price_changes.is_empty() {
        output.push_str("💲 PRICE CHANGES:\n");
        for change in &result.price_changes {
            output.push_str(&format!(
                "   • {} [{}] ${:.2} → ${:.2} ({:+.1}%)\n",
                change.title, change.platform, change.old_price, change.new_price, change.change_percent
            ));
        }
        output.push('\n');
    }

    if !result.errors.is_empty() {
        output.push_str("⚠️  ERRORS:\n");
        for error in &result.errors {
            output.push_str(&format!("   • {}: {}\n", error.listing_id, error.message));
        }
        output.push('\n');
    }

    if !result.has_changes() && result.errors.is_empty() {
        output.push_str("No changes detected.\n\n");
    }

    output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::{PriceChange, Platform};
    use chrono::Utc;

    #[test]
    fn test_report_lists_price_changes() {
        let result = TrackingResult {
            checked: 1,
            price_changes: vec![PriceChange {
                listing_id: "p1".to_string(),
                title: "drone".to_string(),
                platform: Platform::Ebay,
                old_price: 400.0,
                new_price: 350.0,
                change_percent: -12.5,
                detected_at: Utc::now(),
            }],
            ..TrackingResult::default()
        };

        let report = format_cycle_report(&result, Duration::from_secs(3));
        assert!(report.contains("drone [EBAY] $400.00 → $350.00 (-12.5%)"));
        assert!(!report.contains("No changes detected"));
    }

    #[test]
    fn test_quiet_cycle() {
        let report = format_cycle_report(&TrackingResult::default(), Duration::ZERO);
        assert!(report.contains("No changes detected."));
    }
}
