//! 应用配置模块

use crate::error::ExportError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// 覆盖访问令牌的环境变量
pub const TOKEN_ENV: &str = "ASSETEXPORT_TOKEN";

/// 导出配置（目标仓库、分支、凭证）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// 访问令牌
    #[serde(default)]
    pub token: String,
    /// 目标仓库，格式 owner/name
    #[serde(default)]
    pub repo: String,
    /// 写入的目标分支
    #[serde(default)]
    pub branch: String,
    /// 清单文件在仓库中的路径
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,
    /// 读取清单的固定分支（与写入分支无关）
    #[serde(default = "default_manifest_ref")]
    pub manifest_ref: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// 公开访问地址前缀，用于生成资源 url
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_library_name")]
    pub library_name: String,
    #[serde(default = "default_library_version")]
    pub library_version: String,
    /// HTTP 请求超时（秒），不设置则不限制
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_manifest_path() -> String {
    "metadata.json".to_string()
}

fn default_manifest_ref() -> String {
    "main".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_library_name() -> String {
    "Team Graphics Library".to_string()
}

fn default_library_version() -> String {
    "1.0.0".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            repo: String::new(),
            branch: String::new(),
            manifest_path: default_manifest_path(),
            manifest_ref: default_manifest_ref(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            library_name: default_library_name(),
            library_version: default_library_version(),
            timeout_secs: None,
        }
    }
}

impl ExportSettings {
    /// 从配置文件加载导出配置
    pub fn load(config_dir: &Path) -> Self {
        let config_file = config_dir.join("config.json");
        fs::read_to_string(&config_file)
            .ok()
            .and_then(|content| serde_json::from_str::<serde_json::Value>(&content).ok())
            .and_then(|config| config.get("github").cloned())
            .and_then(|section| serde_json::from_value::<ExportSettings>(section).ok())
            .unwrap_or_default()
    }

    /// 保存导出配置，保留文件中的其他配置段
    pub fn save(&self, config_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(config_dir)?;
        let config_file = config_dir.join("config.json");

        let mut config: serde_json::Value = if config_file.exists() {
            let content = fs::read_to_string(&config_file)?;
            serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
        } else {
            serde_json::json!({})
        };

        config["github"] = serde_json::to_value(self).map_err(io::Error::other)?;

        let content = serde_json::to_string_pretty(&config).map_err(io::Error::other)?;
        fs::write(&config_file, content)
    }

    /// 用环境变量覆盖令牌
    pub fn with_env_token(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.token = token.trim().to_string();
            }
        }
        self
    }

    /// 检查导出所需的配置是否齐全
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.token.trim().is_empty() {
            return Err(ExportError::Precondition("未配置访问令牌".to_string()));
        }
        if self.repo.trim().is_empty() {
            return Err(ExportError::Precondition("未配置目标仓库".to_string()));
        }
        if self.branch.trim().is_empty() {
            return Err(ExportError::Precondition("未配置目标分支".to_string()));
        }

        let mut parts = self.repo.trim().split('/');
        let valid = matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        );
        if !valid {
            return Err(ExportError::Precondition(format!(
                "仓库格式应为 owner/name: {}",
                self.repo
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> ExportSettings {
        ExportSettings {
            token: "ghp_test".to_string(),
            repo: "acme/graphics".to_string(),
            branch: "design-sync".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_fields() {
        for settings in [
            ExportSettings {
                token: String::new(),
                ..valid_settings()
            },
            ExportSettings {
                repo: "  ".to_string(),
                ..valid_settings()
            },
            ExportSettings {
                branch: String::new(),
                ..valid_settings()
            },
        ] {
            assert!(matches!(
                settings.validate(),
                Err(ExportError::Precondition(_))
            ));
        }
    }

    #[test]
    fn test_validate_repo_format() {
        for repo in ["acme", "acme/", "/graphics", "acme/graphics/extra"] {
            let settings = ExportSettings {
                repo: repo.to_string(),
                ..valid_settings()
            };
            assert!(settings.validate().is_err(), "{} 应当无效", repo);
        }
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ExportSettings::load(dir.path());
        assert_eq!(settings, ExportSettings::default());
        assert_eq!(settings.manifest_ref, "main");
        assert_eq!(settings.manifest_path, "metadata.json");
    }

    #[test]
    fn test_save_keeps_other_sections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"log": {"level": "debug"}}"#,
        )
        .unwrap();

        let settings = valid_settings();
        settings.save(dir.path()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("config.json")).unwrap())
                .unwrap();
        assert_eq!(raw["log"]["level"], "debug");
        assert_eq!(raw["github"]["repo"], "acme/graphics");
        assert_eq!(ExportSettings::load(dir.path()), settings);
    }

    #[test]
    fn test_load_partial_section_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"github": {"token": "t", "repo": "a/b", "branch": "dev"}}"#,
        )
        .unwrap();

        let settings = ExportSettings::load(dir.path());
        assert_eq!(settings.branch, "dev");
        assert_eq!(settings.api_base, "https://api.github.com");
        assert_eq!(settings.library_name, "Team Graphics Library");
    }
}
