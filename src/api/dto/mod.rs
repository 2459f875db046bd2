//! DTO 模块
//!
//! 数据传输对象，用于 API 请求和响应的序列化。

pub mod analysis_dto;
pub mod target_dto;

pub use analysis_dto::*;
pub use target_dto::*;
