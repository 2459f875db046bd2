//! Handlers 模块
//!
//! HTTP 请求处理程序。

pub mod analysis_handler;
pub mod target_handler;

pub use analysis_handler::*;
pub use target_handler::*;
