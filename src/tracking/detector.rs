use super::heuristics::heuristics_for;
use super::types::Platform;

/// Best-effort sold detection.
///
/// True when any sold indicator for `platform` (or the fallback list)
/// occurs in the page, ignoring case. Pages that hide their sold state, or
/// mention "sold" for unrelated reasons, are misread; nothing retries or
/// escalates on that.
pub fn is_sold(page_content: &str, platform: Platform) -> bool {
    let page = page_content.to_lowercase();
    heuristics_for(platform)
        .sold_indicators
        .iter()
        .any(|indicator| page.contains(indicator))
}
