//! Per-marketplace page heuristics.
//!
//! Adding a marketplace is a table entry, not a code path: the detector and
//! the extractor only ever consult [`heuristics_for`].

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::types::Platform;

/// Captures a money amount such as `1,234` or `349.99` in group 1.
const AMOUNT: &str = r"([\d,]+(?:\.\d{1,2})?)";

pub struct PlatformHeuristics {
    /// Lowercase substrings whose presence means the listing is gone.
    pub sold_indicators: &'static [&'static str],
    /// Tried in order; group 1 of each pattern is the price.
    pub price_patterns: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&p.replace("{amount}", AMOUNT)).expect("static price pattern"))
        .collect()
}

static FALLBACK: LazyLock<PlatformHeuristics> = LazyLock::new(|| PlatformHeuristics {
    sold_indicators: &["sold", "no longer available"],
    price_patterns: Vec::new(),
});

/// Tried after the platform's own patterns, for every platform.
static GENERIC_PRICE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\$\s?{amount}",
        r"(?i)price:\s*\$\s?{amount}",
        r"(?i)asking:\s*\$\s?{amount}",
    ])
});

static TABLE: LazyLock<HashMap<Platform, PlatformHeuristics>> = LazyLock::new(|| {
    let mut table = HashMap::new();

    table.insert(
        Platform::Craigslist,
        PlatformHeuristics {
            sold_indicators: &[
                "this posting has been deleted",
                "this posting has expired",
                "no longer available",
            ],
            price_patterns: compile(&[r#"class="price"[^>]*>\s*\$?\s*{amount}"#]),
        },
    );

    table.insert(
        Platform::Facebook,
        PlatformHeuristics {
            sold_indicators: &["sold", "this listing is unavailable"],
            price_patterns: compile(&[
                r#""listing_price"\s*:\s*\{[^}]*?"amount"\s*:\s*"{amount}""#,
            ]),
        },
    );

    table.insert(
        Platform::Ebay,
        PlatformHeuristics {
            sold_indicators: &["this listing has ended", "winning bid", "sold for"],
            price_patterns: compile(&[
                r#"itemprop="price"[^>]*content="{amount}""#,
                r#"class="x-price-primary"[^>]*>(?:\s*<[^>]+>)*\s*(?:US\s*)?\$\s?{amount}"#,
            ]),
        },
    );

    table.insert(
        Platform::Mercari,
        PlatformHeuristics {
            sold_indicators: &["this item is sold", "\"status\":\"sold\"", "sold out"],
            price_patterns: compile(&[
                r#"data-testid="ItemPrice"[^>]*>(?:\s*<[^>]+>)*\s*\$\s?{amount}"#,
                r#"itemprop="price"[^>]*content="{amount}""#,
            ]),
        },
    );

    table
});

/// Heuristics for `platform`, or the generic fallback entry.
pub fn heuristics_for(platform: Platform) -> &'static PlatformHeuristics {
    TABLE.get(&platform).unwrap_or(&*FALLBACK)
}

pub fn has_dedicated_entry(platform: Platform) -> bool {
    TABLE.contains_key(&platform)
}

/// Platform patterns first, then the generic ones.
pub fn price_patterns_for(platform: Platform) -> impl Iterator<Item = &'static Regex> {
    heuristics_for(platform)
        .price_patterns
        .iter()
        .chain(GENERIC_PRICE_PATTERNS.iter())
}
