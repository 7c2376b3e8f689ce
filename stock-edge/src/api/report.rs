//! Report API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/report?corridor&shelf&sku&color&sort | GET | 汇总报表 |
//! | /api/report/aggregate?sku&color | GET | 单个 SKU+颜色 的全局合计 |

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;
use shared::{AggregateSnapshot, ConsolidatedEntry, ReportFilter, ReportSortKey};

use crate::core::EngineState;

pub fn router() -> Router<EngineState> {
    Router::new()
        .route("/api/report", get(report))
        .route("/api/report/aggregate", get(aggregate))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    corridor: String,
    #[serde(default)]
    shelf: String,
    #[serde(default)]
    sku: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    sort: ReportSortKey,
}

/// GET /api/report
pub async fn report(
    State(state): State<EngineState>,
    Query(query): Query<ReportQuery>,
) -> Json<Vec<ConsolidatedEntry>> {
    let filter = ReportFilter {
        corridor: query.corridor,
        shelf: query.shelf,
        sku: query.sku,
        color: query.color,
    };
    Json(state.inventory.report(&filter, query.sort))
}

#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    sku: String,
    color: String,
}

/// GET /api/report/aggregate
pub async fn aggregate(
    State(state): State<EngineState>,
    Query(query): Query<AggregateQuery>,
) -> Json<AggregateSnapshot> {
    Json(state.inventory.aggregate(&query.sku, &query.color))
}
