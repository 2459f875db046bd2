use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

/// 检索（二分定位）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// 单个目标的时间预算（毫秒）
    pub budget_ms: u64,
    /// 二分最大迭代次数
    pub max_iterations: u32,
    /// 收敛精度（天）
    pub resolution_days: u32,
    /// 单次远端调用超时（毫秒）
    pub probe_timeout_ms: u64,
    /// 并发扫描的目标数上限
    pub max_concurrent_scans: usize,
    /// 列表分页大小
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            budget_ms: 1600,
            max_iterations: 32,
            resolution_days: 1,
            probe_timeout_ms: 1000,
            max_concurrent_scans: 4,
            page_size: 500,
        }
    }
}

impl SearchConfig {
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// 手动日期与检测结果的对账配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// 相差多少个月以上视为冲突
    pub threshold_months: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            threshold_months: 12,
        }
    }
}

/// Gmail API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// API 根地址
    pub api_base: String,
    /// OAuth 令牌端点
    pub token_uri: String,
    /// OAuth 客户端 ID
    pub client_id: String,
    /// OAuth 客户端密钥
    pub client_secret: String,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gmail.googleapis.com".into(),
            token_uri: "https://oauth2.googleapis.com/token".into(),
            client_id: String::new(),
            client_secret: String::new(),
        }
    }
}

/// 公开资料查询配置（X / Twitter）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Bearer 令牌，未配置时跳过查询
    pub bearer_token: Option<String>,
    /// 主端点
    pub primary_base: String,
    /// 镜像端点
    pub mirror_base: String,
    /// 请求超时（秒）
    pub timeout_secs: u64,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            primary_base: "https://api.x.com".into(),
            mirror_base: "https://api.twitter.com".into(),
            timeout_secs: 10,
        }
    }
}

/// 采用曲线数据集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurvesConfig {
    /// 数据集 JSON 路径，未配置时使用内置数据
    pub dataset_path: Option<PathBuf>,
    /// 时间线展示单位（默认百万）
    pub display_unit: u64,
}

impl Default for CurvesConfig {
    fn default() -> Self {
        Self {
            dataset_path: None,
            display_unit: 1_000_000,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 检索配置
    pub search: SearchConfig,
    /// 对账配置
    pub reconciliation: ReconciliationConfig,
    /// Gmail 配置
    pub gmail: GmailConfig,
    /// 资料查询配置
    pub profile: ProfileConfig,
    /// 曲线数据配置
    pub curves: CurvesConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            search: SearchConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            gmail: GmailConfig::default(),
            profile: ProfileConfig::default(),
            curves: CurvesConfig::default(),
            logging: LoggingConfig::default(),
            app_name: "firstmover".into(),
            environment: "development".into(),
        }
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".into();
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config.curves.dataset_path = Some(PathBuf::from("./data/adoption_curves.json"));
        config
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = "production".into();
        config.logging.structured = true;
        config.search.max_concurrent_scans = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4);
        config
    }
}
