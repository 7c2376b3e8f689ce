//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/health | GET | 存活检查与运行概况 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::EngineState;

pub fn router() -> Router<EngineState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 状态 (ok)
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    shelves: usize,
    occupied_positions: usize,
    /// 尚未被存储确认的本地写入
    pending_writes: usize,
    moves_in_flight: usize,
    mirror_enabled: bool,
}

/// GET /api/health
pub async fn health(State(state): State<EngineState>) -> Json<HealthResponse> {
    let (shelves, occupied_positions, pending_writes) = {
        let replica = state.replica.read();
        (
            replica.confirmed().shelves().count(),
            replica.confirmed().occupied_count(),
            replica.pending_count(),
        )
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        shelves,
        occupied_positions,
        pending_writes,
        moves_in_flight: state.moves.in_flight_count(),
        mirror_enabled: state.sync.is_enabled(),
    })
}
