//! Move API
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/moves | POST | 开始并提交一次移库 |

use axum::{Json, Router, extract::State, routing::post};
use shared::AppResult;

use super::actor::RequestActor;
use crate::core::EngineState;
use crate::moves::{MoveReceipt, MoveRequest};

pub fn router() -> Router<EngineState> {
    Router::new().route("/api/moves", post(create))
}

/// POST /api/moves
pub async fn create(
    State(state): State<EngineState>,
    RequestActor(actor): RequestActor,
    Json(request): Json<MoveRequest>,
) -> AppResult<Json<MoveReceipt>> {
    Ok(Json(state.moves.move_product(&actor, request).await?))
}
