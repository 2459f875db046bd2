//! FirstMover - 平台早期用户估算服务
//!
//! 从用户邮箱中定位各平台最早的注册邮件，与用户手动填写的加入时间对账，
//! 再按平台的用户增长曲线换算为早期用户百分位。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
