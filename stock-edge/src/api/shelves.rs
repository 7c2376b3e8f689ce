//! Shelf API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/shelves | GET | 所有货架 |
//! | /api/shelves | POST | 新建货架 |
//! | /api/shelves/{id} | GET | 单个货架 |
//! | /api/shelves/{id}/size | PUT | 调整尺寸 |
//! | /api/shelves/{id}?force=bool | DELETE | 删除货架 |

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use shared::models::ShelfResize;
use shared::{AppResult, Shelf};

use super::actor::RequestActor;
use crate::core::EngineState;

pub fn router() -> Router<EngineState> {
    Router::new()
        .route("/api/shelves", get(list).post(create))
        .route("/api/shelves/{id}", get(get_by_id).delete(remove))
        .route("/api/shelves/{id}/size", put(resize))
}

/// GET /api/shelves
pub async fn list(State(state): State<EngineState>) -> Json<Vec<Shelf>> {
    Json(state.inventory.shelves())
}

/// GET /api/shelves/{id}
pub async fn get_by_id(State(state): State<EngineState>, Path(id): Path<i64>) -> AppResult<Json<Shelf>> {
    Ok(Json(state.inventory.shelf(id)?))
}

/// POST /api/shelves
pub async fn create(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Json(payload): Json<Shelf>,
) -> AppResult<Json<Shelf>> {
    Ok(Json(state.inventory.add_shelf(&actor, payload).await?))
}

/// PUT /api/shelves/{id}/size
pub async fn resize(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<i64>,
    Json(payload): Json<ShelfResize>,
) -> AppResult<Json<Shelf>> {
    let shelf = state
        .inventory
        .resize_shelf(&actor, id, payload.rows, payload.cols)
        .await?;
    Ok(Json(shelf))
}

#[derive(Debug, Default, Deserialize)]
pub struct RemoveQuery {
    #[serde(default)]
    force: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    shelf: Shelf,
    /// Positions cleared by a forced removal
    discarded: Vec<String>,
}

/// DELETE /api/shelves/{id}
pub async fn remove(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Path(id): Path<i64>,
    Query(query): Query<RemoveQuery>,
) -> AppResult<Json<RemoveResponse>> {
    let removed = state.inventory.remove_shelf(&actor, id, query.force).await?;
    Ok(Json(RemoveResponse {
        shelf: removed.shelf,
        discarded: removed.discarded.iter().map(|(key, _)| key.to_string()).collect(),
    }))
}
