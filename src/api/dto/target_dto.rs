//! 目标 DTO
//!
//! 定义目标列表与时间线的响应数据结构。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::report::SeriesPoint;

/// 目标响应
#[derive(Debug, Serialize, Deserialize)]
pub struct TargetResponse {
    pub key: String,
    pub display_name: String,
    pub metric_label: String,
    /// 邮箱检索起始日期
    pub window_floor: NaiveDate,
    /// 平台上线日期（无曲线时为空）
    pub launch_date: Option<NaiveDate>,
    /// 当前用户数（无曲线时为空）
    pub today_users: Option<u64>,
}

/// 目标列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ListTargetsResponse {
    pub targets: Vec<TargetResponse>,
    pub total: usize,
}

/// 时间线响应
#[derive(Debug, Serialize, Deserialize)]
pub struct TimelineResponse {
    pub key: String,
    pub display_name: String,
    pub metric_label: String,
    /// 展示单位（每个数值代表的用户数）
    pub unit: u64,
    pub launch_date: NaiveDate,
    pub series: Vec<SeriesPoint>,
}
