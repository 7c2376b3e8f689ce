//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`shelves`] - 货架管理
//! - [`positions`] - 货位商品读写
//! - [`moves`] - 移库
//! - [`report`] - 汇总报表
//! - [`settings`] - 运行时设置
//!
//! 操作人通过 `X-Actor-Id` / `X-Actor-Name` / `X-Actor-Email` 请求头传入，
//! 见 [`actor::RequestActor`]。

pub mod actor;
pub mod health;
pub mod moves;
pub mod positions;
pub mod report;
pub mod settings;
pub mod shelves;

use axum::Router;
use http::{HeaderName, HeaderValue};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::EngineState;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// All routes, without middleware or state
pub fn build_router() -> Router<EngineState> {
    Router::new()
        .merge(health::router())
        .merge(shelves::router())
        .merge(positions::router())
        .merge(moves::router())
        .merge(report::router())
        .merge(settings::router())
}

/// Fully configured application (used by the server and by tests)
pub fn build_app(state: EngineState) -> Router {
    build_router()
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
        .with_state(state)
}
