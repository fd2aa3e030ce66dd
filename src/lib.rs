use std::path::PathBuf;

pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::ExportSettings;
pub use core::{ExportPipeline, ExportReport, ExportStage, Frame};
pub use error::{ExportError, RemoteError};

/// 应用数据目录（config.json 与日志所在位置）
///
/// 系统配置目录不可用时退回到当前目录下的 `.assetexport`。
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("assetexport"))
        .unwrap_or_else(|| PathBuf::from(".assetexport"))
}
