use shared::{ConsolidatedEntry, ReportSortKey};
use std::cmp::Ordering;

fn by_location(a: &ConsolidatedEntry, b: &ConsolidatedEntry) -> Ordering {
    let (la, lb) = (&a.last_location, &b.last_location);
    la.corridor
        .cmp(&lb.corridor)
        .then_with(|| la.shelf_name.cmp(&lb.shelf_name))
        .then_with(|| la.label.cmp(&lb.label))
}

fn by_sku(a: &ConsolidatedEntry, b: &ConsolidatedEntry) -> Ordering {
    a.sku.cmp(&b.sku).then_with(|| a.color.cmp(&b.color))
}

fn by_color(a: &ConsolidatedEntry, b: &ConsolidatedEntry) -> Ordering {
    a.color.cmp(&b.color).then_with(|| a.sku.cmp(&b.sku))
}

/// Sort entries in place
///
/// The sort is stable, so entries equal on every compared field keep their
/// input order, which makes sorting idempotent.
pub fn sort_report(entries: &mut [ConsolidatedEntry], key: ReportSortKey) {
    match key {
        ReportSortKey::Location => entries.sort_by(|a, b| by_location(a, b).then_with(|| by_sku(a, b))),
        ReportSortKey::Sku => entries.sort_by(|a, b| by_sku(a, b).then_with(|| by_location(a, b))),
        ReportSortKey::Quantity => entries.sort_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| by_sku(a, b))
                .then_with(|| by_location(a, b))
        }),
        ReportSortKey::Color => {
            entries.sort_by(|a, b| by_color(a, b).then_with(|| by_location(a, b)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::LocationRef;

    fn entry(sku: &str, color: &str, qty: u64, corridor: &str, label: &str) -> ConsolidatedEntry {
        let location = LocationRef {
            shelf_id: 1,
            shelf_name: "S".into(),
            corridor: corridor.into(),
            row: 0,
            col: 0,
            label: label.into(),
            quantity: qty,
            last_modified: 0,
        };
        ConsolidatedEntry {
            sku: sku.into(),
            color: color.into(),
            unit: "un".into(),
            quantity: qty,
            last_location: location.clone(),
            locations: vec![location],
        }
    }

    fn sample() -> Vec<ConsolidatedEntry> {
        vec![
            entry("B", "RED", 3, "C2", "A1"),
            entry("A", "RED", 7, "C1", "B1"),
            entry("A", "BLUE", 7, "C1", "A2"),
            entry("C", "GREEN", 1, "C1", "A2"),
        ]
    }

    fn skus(entries: &[ConsolidatedEntry]) -> Vec<String> {
        entries.iter().map(|e| e.key()).collect()
    }

    #[test]
    fn location_order() {
        let mut entries = sample();
        sort_report(&mut entries, ReportSortKey::Location);
        assert_eq!(skus(&entries), vec!["A|BLUE", "C|GREEN", "A|RED", "B|RED"]);
    }

    #[test]
    fn quantity_descending_with_sku_tiebreak() {
        let mut entries = sample();
        sort_report(&mut entries, ReportSortKey::Quantity);
        assert_eq!(skus(&entries), vec!["A|BLUE", "A|RED", "B|RED", "C|GREEN"]);
    }

    #[test]
    fn color_then_sku() {
        let mut entries = sample();
        sort_report(&mut entries, ReportSortKey::Color);
        assert_eq!(skus(&entries), vec!["A|BLUE", "C|GREEN", "A|RED", "B|RED"]);
    }

    #[test]
    fn sorting_twice_changes_nothing() {
        for key in [
            ReportSortKey::Location,
            ReportSortKey::Sku,
            ReportSortKey::Quantity,
            ReportSortKey::Color,
        ] {
            let mut once = sample();
            sort_report(&mut once, key);
            let mut twice = once.clone();
            sort_report(&mut twice, key);
            assert_eq!(once, twice, "{key:?}");
        }
    }
}
