//! Settings API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/settings | GET | 当前设置 |
//! | /api/settings | PUT | 部分更新 (仅管理员) |

use axum::{Json, Router, extract::State, routing::get};
use shared::models::SettingsPatch;
use shared::{AppResult, InventorySettings};

use super::actor::RequestActor;
use crate::core::EngineState;

pub fn router() -> Router<EngineState> {
    Router::new().route("/api/settings", get(current).put(update))
}

/// GET /api/settings
pub async fn current(State(state): State<EngineState>) -> Json<InventorySettings> {
    Json(state.settings_service.current())
}

/// PUT /api/settings
pub async fn update(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Json(patch): Json<SettingsPatch>,
) -> AppResult<Json<InventorySettings>> {
    Ok(Json(state.settings_service.update(&actor, patch).await?))
}
