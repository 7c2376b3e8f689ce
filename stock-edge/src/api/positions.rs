//! Position API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/positions/{shelf}/{row}/{col} | GET | 读取商品 |
//! | /api/positions/{shelf}/{row}/{col} | PUT | 写入商品 (无数量时清空) |
//! | /api/positions/{shelf}/{row}/{col} | DELETE | 清空货位 |
//! | /api/positions/{shelf}/{row}/{col}/adjust | POST | 增减单个颜色数量 |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use serde::Deserialize;
use shared::{AppResult, PositionKey, Product};

use super::actor::RequestActor;
use crate::core::EngineState;

pub fn router() -> Router<EngineState> {
    Router::new()
        .route(
            "/api/positions/{shelf}/{row}/{col}",
            get(get_product).put(set_product).delete(clear_product),
        )
        .route("/api/positions/{shelf}/{row}/{col}/adjust", post(adjust))
}

fn key((shelf, row, col): (i64, u32, u32)) -> PositionKey {
    PositionKey::new(shelf, row, col)
}

/// GET /api/positions/{shelf}/{row}/{col}
pub async fn get_product(
    State(state): State<EngineState>,
    Path(path): Path<(i64, u32, u32)>,
) -> AppResult<Json<Option<Product>>> {
    Ok(Json(state.inventory.get_product(&key(path))?))
}

/// PUT /api/positions/{shelf}/{row}/{col}
pub async fn set_product(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Path(path): Path<(i64, u32, u32)>,
    Json(product): Json<Product>,
) -> AppResult<Json<Option<Product>>> {
    let stored = state.inventory.set_product(&actor, key(path), Some(product)).await?;
    Ok(Json(stored))
}

/// DELETE /api/positions/{shelf}/{row}/{col}
pub async fn clear_product(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Path(path): Path<(i64, u32, u32)>,
) -> AppResult<Json<Option<Product>>> {
    let stored = state.inventory.set_product(&actor, key(path), None).await?;
    Ok(Json(stored))
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    color: String,
    /// Units to add (negative removes)
    delta: i64,
}

/// POST /api/positions/{shelf}/{row}/{col}/adjust
pub async fn adjust(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Path(path): Path<(i64, u32, u32)>,
    Json(payload): Json<AdjustRequest>,
) -> AppResult<Json<Option<Product>>> {
    let stored = state
        .inventory
        .adjust_quantity(&actor, key(path), &payload.color, payload.delta)
        .await?;
    Ok(Json(stored))
}
