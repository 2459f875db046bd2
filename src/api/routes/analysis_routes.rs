//! Analysis Routes
//!
//! 定义分析相关的 API 路由。

use crate::api::handlers::analysis_handler::*;
use axum::{Router, routing::post};

use crate::api::app_state::AppState;

/// 创建分析路由器
pub fn create_analysis_router() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
