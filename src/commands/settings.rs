//! 配置相关命令

use crate::config::ExportSettings;
use crate::logging::LogConfig;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// 要修改的配置项，未设置的字段保持不变
#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub token: Option<String>,
    pub repo: Option<String>,
    pub branch: Option<String>,
    pub manifest_ref: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsView {
    github: ExportSettings,
    log: LogConfig,
}

/// 令牌只显示前 4 位
fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let prefix: String = token.chars().take(4).collect();
    format!("{}****", prefix)
}

/// 获取当前配置（令牌已脱敏）
pub fn show_settings(data_dir: &Path) -> Result<String> {
    let mut github = ExportSettings::load(data_dir);
    github.token = mask_token(&github.token);
    let view = SettingsView {
        github,
        log: LogConfig::load(data_dir),
    };
    Ok(serde_json::to_string_pretty(&view)?)
}

/// 修改并保存配置
pub fn update_settings(data_dir: &Path, update: SettingsUpdate) -> Result<ExportSettings> {
    let mut settings = ExportSettings::load(data_dir);

    if let Some(token) = update.token {
        settings.token = token.trim().to_string();
    }
    if let Some(repo) = update.repo {
        settings.repo = repo.trim().to_string();
    }
    if let Some(branch) = update.branch {
        settings.branch = branch.trim().to_string();
    }
    if let Some(reference) = update.manifest_ref {
        settings.manifest_ref = reference.trim().to_string();
    }

    // 日志级别无效时不写入任何配置
    let log = match update.log_level {
        Some(level) => {
            let mut log = LogConfig::load(data_dir);
            log.set_level(&level).map_err(anyhow::Error::msg)?;
            Some(log)
        }
        None => None,
    };

    settings
        .save(data_dir)
        .with_context(|| format!("保存配置失败: {}", data_dir.display()))?;

    if let Some(log) = log {
        log.save(data_dir)
            .with_context(|| format!("保存日志配置失败: {}", data_dir.display()))?;
    }

    tracing::info!("配置已保存: {}", data_dir.display());
    Ok(settings)
}
