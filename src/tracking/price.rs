use super::heuristics::price_patterns_for;
use super::types::Platform;

/// Extracts the current price from a listing page.
///
/// Patterns are tried in order, platform-specific before generic, each on
/// its first match. The first capture that parses to a finite positive
/// number wins. `None` means "price unknown", never zero.
pub fn extract_price(page_content: &str, platform: Platform) -> Option<f64> {
    price_patterns_for(platform).find_map(|pattern| {
        pattern
            .captures(page_content)
            .and_then(|caps| caps.get(1))
            .and_then(|amount| parse_amount(amount.as_str()))
    })
}

fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_craigslist_price_class() {
        let page = r#"<span class="price">$1,250</span> ... shipping $20"#;
        assert_eq!(extract_price(page, Platform::Craigslist), Some(1250.0));
    }

    #[test]
    fn test_ebay_microdata_beats_generic_dollar() {
        let page = r#"Was $120.00 <span itemprop="price" content="89.99">US $89.99</span>"#;
        assert_eq!(extract_price(page, Platform::Ebay), Some(89.99));
    }

    #[test]
    fn test_facebook_listing_price_json() {
        let page = r#"{"listing_price":{"formatted_amount":"$350","amount":"350.00"}}"#;
        assert_eq!(extract_price(page, Platform::Facebook), Some(350.0));
    }

    #[test]
    fn test_mercari_item_price() {
        let page = r#"<div data-testid="ItemPrice"><span>$45</span></div>"#;
        assert_eq!(extract_price(page, Platform::Mercari), Some(45.0));
    }

    #[test]
    fn test_generic_patterns() {
        assert_eq!(extract_price("Only $75 obo", Platform::Other), Some(75.0));
        assert_eq!(extract_price("Price: $2,400.50", Platform::Offerup), Some(2400.5));
        assert_eq!(extract_price("asking: $60", Platform::Other), Some(60.0));
    }

    #[test]
    fn test_zero_price_falls_through_to_next_pattern() {
        // The first "$" match is zero, so the "asking:" pattern supplies it.
        let page = "Shipping $0 - Asking: $150";
        assert_eq!(extract_price(page, Platform::Other), Some(150.0));
    }

    #[test]
    fn test_no_price_is_none() {
        assert_eq!(extract_price("Make me an offer", Platform::Craigslist), None);
        assert_eq!(extract_price("", Platform::Ebay), None);
        assert_eq!(extract_price("Free: $0", Platform::Other), None);
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert_eq!(parse_amount("1,000"), Some(1000.0));
        assert_eq!(parse_amount("0.00"), None);
        assert_eq!(parse_amount(","), None);
    }
}
