use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. ./firstmover.toml（缺省字段取内置默认值）
    /// 2. 环境变量 FIRSTMOVER_*（嵌套字段以 `__` 分隔）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("FIRSTMOVER_").split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.search.budget_ms == 0 {
            return Err(ConfigValidationError::InvalidBudget);
        }

        if config.search.probe_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidProbeTimeout);
        }

        if config.search.max_iterations == 0 || config.search.resolution_days == 0 {
            return Err(ConfigValidationError::InvalidBisection);
        }

        if config.search.max_concurrent_scans == 0 {
            return Err(ConfigValidationError::InvalidConcurrency);
        }

        if config.reconciliation.threshold_months == 0 {
            return Err(ConfigValidationError::InvalidThreshold);
        }

        if config.curves.display_unit == 0 {
            return Err(ConfigValidationError::InvalidDisplayUnit);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("检索时间预算必须大于 0")]
    InvalidBudget,

    #[error("单次远程调用超时必须大于 0")]
    InvalidProbeTimeout,

    #[error("二分迭代次数与精度必须大于 0")]
    InvalidBisection,

    #[error("并发扫描数必须大于 0")]
    InvalidConcurrency,

    #[error("对账阈值（月）必须大于 0")]
    InvalidThreshold,

    #[error("展示单位必须大于 0")]
    InvalidDisplayUnit,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("firstmover.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_without_file_uses_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("missing.toml")?;
            assert_eq!(config.server.port, 5000);
            assert_eq!(config.search.max_iterations, 32);
            Ok(())
        });
    }

    #[test]
    fn test_file_and_env_layering() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "firstmover.toml",
                r#"
                [search]
                budget_ms = 2500

                [reconciliation]
                threshold_months = 6
                "#,
            )?;
            jail.set_env("FIRSTMOVER_SERVER__PORT", "8088");

            let config = ConfigLoader::load()?;
            assert_eq!(config.search.budget_ms, 2500);
            assert_eq!(config.search.max_iterations, 32);
            assert_eq!(config.reconciliation.threshold_months, 6);
            assert_eq!(config.server.port, 8088);
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = AppConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.search.budget_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidBudget)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_call_timeout() {
        let mut config = AppConfig::default();
        config.search.probe_timeout_ms = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidProbeTimeout)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let mut config = AppConfig::default();
        config.reconciliation.threshold_months = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidThreshold)
        ));
    }
}
