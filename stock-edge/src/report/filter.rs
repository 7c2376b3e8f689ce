use shared::{ConsolidatedEntry, LocationRef, ReportFilter};

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn any_location(entry: &ConsolidatedEntry, pred: impl Fn(&LocationRef) -> bool) -> bool {
    entry.locations.iter().any(pred)
}

/// Keep entries matching every non-empty predicate
///
/// Matching is case-insensitive substring. Corridor and shelf predicates
/// match when any contributing location matches. Order is preserved.
pub fn filter_report(entries: &[ConsolidatedEntry], filter: &ReportFilter) -> Vec<ConsolidatedEntry> {
    if filter.is_empty() {
        return entries.to_vec();
    }
    entries
        .iter()
        .filter(|e| contains_ci(&e.sku, &filter.sku))
        .filter(|e| contains_ci(&e.color, &filter.color))
        .filter(|e| {
            filter.corridor.trim().is_empty()
                || any_location(e, |l| contains_ci(&l.corridor, &filter.corridor))
        })
        .filter(|e| {
            filter.shelf.trim().is_empty()
                || any_location(e, |l| contains_ci(&l.shelf_name, &filter.shelf))
        })
        .cloned()
        .collect()
}
