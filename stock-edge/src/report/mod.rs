//! Consolidation engine
//!
//! Read-only projections of the grid: per SKU+color totals, filtering and
//! sorting. Nothing here is persisted.

mod consolidate;
mod filter;
mod sort;

pub use consolidate::{aggregate_for, generate_report};
pub use filter::filter_report;
pub use sort::sort_report;

use shared::{ConsolidatedEntry, ReportFilter, ReportSortKey};

use crate::grid::GridState;

/// Generate, filter and sort in one pass (the export surface)
pub fn build_report(
    grid: &GridState,
    filter: &ReportFilter,
    sort: ReportSortKey,
) -> Vec<ConsolidatedEntry> {
    let mut entries = filter_report(&generate_report(grid), filter);
    sort_report(&mut entries, sort);
    entries
}
