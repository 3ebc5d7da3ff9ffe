//! 工具模块

pub mod config_paths;
pub mod logger;
