//! 配置路径管理
//!
//! - 持久化配置保存在 ~/.procpool/
//! - 运行时数据（日志）保存在 /tmp/.procpool/

use crate::config::{CONFIG_DIRECTORY, CONFIG_FILE_NAME, LOG_FILE_NAME};
use crate::error::ConfigError;
use std::path::PathBuf;

/// 配置文件路径集合
pub struct ConfigPaths {
    /// 主配置文件
    pub config_file: PathBuf,
}

impl ConfigPaths {
    pub fn new() -> Result<Self, ConfigError> {
        let home_dir = dirs::home_dir().ok_or(ConfigError::HomeDirMissing)?;
        Ok(Self::with_home(home_dir))
    }

    pub fn with_home(home_dir: PathBuf) -> Self {
        Self {
            config_file: home_dir.join(CONFIG_DIRECTORY).join(CONFIG_FILE_NAME),
        }
    }

    /// 日志文件（保存在运行时目录，不依赖 home 目录）
    pub fn runtime_log_file() -> PathBuf {
        std::env::temp_dir()
            .join(CONFIG_DIRECTORY)
            .join(LOG_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_layout() {
        let paths = ConfigPaths::with_home(PathBuf::from("/home/worker"));
        assert_eq!(
            paths.config_file,
            PathBuf::from("/home/worker/.procpool/config.json")
        );
        let log_file = ConfigPaths::runtime_log_file();
        assert!(log_file.ends_with(".procpool/procpool.log"));
        assert!(log_file.starts_with(std::env::temp_dir()));
    }
}
