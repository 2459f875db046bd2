//! Target Routes
//!
//! 定义目标相关的 API 路由。

use crate::api::handlers::target_handler::*;
use axum::{Router, routing::get};

use crate::api::app_state::AppState;

/// 创建目标路由器
pub fn create_target_router() -> Router<AppState> {
    Router::new()
        .route("/targets", get(list_targets))
        .route("/targets/:key/timeline", get(get_timeline))
}
