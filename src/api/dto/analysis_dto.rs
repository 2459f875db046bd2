//! 分析 DTO
//!
//! 定义分析请求的数据结构。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::models::join::ManualEntry;
use crate::services::analysis::AnalysisRequest;

/// 分析请求
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeRequest {
    /// 手动填写的加入月份，`target_key -> "YYYY-MM"`
    pub manual: BTreeMap<String, String>,
    /// 公开资料用户名
    pub profile_handle: Option<String>,
    /// Google OAuth 刷新令牌
    pub refresh_token: Option<String>,
    /// 仅分析这些目标
    pub targets: Option<Vec<String>>,
}

impl AnalyzeRequest {
    /// 转换为服务层请求；空白的手动日期视为未填写
    pub fn into_analysis_request(self) -> Result<AnalysisRequest> {
        let manual = self
            .manual
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| ManualEntry::parse(key, value))
            .collect::<Result<Vec<_>>>()?;

        Ok(AnalysisRequest {
            targets: self.targets,
            manual,
            profile_handle: self
                .profile_handle
                .filter(|h| !h.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_manual_values_are_skipped() {
        let request: AnalyzeRequest = serde_json::from_str(
            r#"{"manual": {"twitter": "2009-03", "reddit": " "}, "profile_handle": ""}"#,
        )
        .unwrap();

        let request = request.into_analysis_request().unwrap();
        assert_eq!(request.manual.len(), 1);
        assert_eq!(request.manual[0].target_key, "twitter");
        assert_eq!(request.profile_handle, None);
        assert_eq!(request.targets, None);
    }

    #[test]
    fn test_malformed_manual_value_is_rejected() {
        let request = AnalyzeRequest {
            manual: BTreeMap::from([("twitter".to_string(), "March 2009".to_string())]),
            ..Default::default()
        };
        assert!(request.into_analysis_request().is_err());
    }
}
