//! 资源清单（metadata.json）的读取、合并与序列化

use super::status::StatusReporter;
use crate::config::ExportSettings;
use crate::storage::RemoteContent;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 清单中的一条资源记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub url: String,
    /// 由其他工具填写，导出流程保持为空
    #[serde(default)]
    pub size: String,
    #[serde(default)]
    pub last_updated: String,
    /// 其他工具写入的未知字段，原样保留
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `assets` 数组中的一项
///
/// 字段类型不符合 [`AssetRecord`] 的条目按原值保留，写回时不做任何改动。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Record(AssetRecord),
    Opaque(Value),
}

impl ManifestEntry {
    fn from_value(value: Value) -> Self {
        match AssetRecord::deserialize(&value) {
            Ok(record) => ManifestEntry::Record(record),
            Err(_) => ManifestEntry::Opaque(value),
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            ManifestEntry::Record(record) => Some(&record.id),
            ManifestEntry::Opaque(value) => value.get("id").and_then(Value::as_str),
        }
    }

    pub fn as_record(&self) -> Option<&AssetRecord> {
        match self {
            ManifestEntry::Record(record) => Some(record),
            ManifestEntry::Opaque(_) => None,
        }
    }
}

impl From<AssetRecord> for ManifestEntry {
    fn from(record: AssetRecord) -> Self {
        ManifestEntry::Record(record)
    }
}

/// 清单文件
///
/// `totalAssets` 不单独存储，序列化时由 `assets` 的长度得出。
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestFile {
    pub name: String,
    pub version: String,
    pub updated: String,
    pub assets: Vec<ManifestEntry>,
}

/// 序列化视图，字段顺序即输出顺序
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ManifestView<'a> {
    name: &'a str,
    version: &'a str,
    updated: &'a str,
    total_assets: usize,
    assets: &'a [ManifestEntry],
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl ManifestFile {
    pub fn empty(name: &str, version: &str, today: NaiveDate) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            updated: format_date(today),
            assets: Vec::new(),
        }
    }

    pub fn total_assets(&self) -> usize {
        self.assets.len()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.assets.iter().position(|a| a.id() == Some(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }
}

/// 清单解析结果
#[derive(Debug)]
enum Parsed {
    Valid(ManifestFile),
    /// 文档可解析但 assets 缺失或无效，保留文档的基本信息
    InvalidAssets(ManifestFile),
}

/// 清单存储
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: String,
    reference: String,
    library_name: String,
    library_version: String,
}

impl ManifestStore {
    pub fn new(settings: &ExportSettings) -> Self {
        Self {
            path: settings.manifest_path.clone(),
            reference: settings.manifest_ref.clone(),
            library_name: settings.library_name.clone(),
            library_version: settings.library_version.clone(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn default_manifest(&self, today: NaiveDate) -> ManifestFile {
        ManifestFile::empty(&self.library_name, &self.library_version, today)
    }

    /// 从固定分支加载清单
    ///
    /// 不存在、内容损坏或读取失败都不会中断流程，而是返回空清单并上报。
    pub async fn load(
        &self,
        remote: &dyn RemoteContent,
        status: &StatusReporter,
        today: NaiveDate,
    ) -> ManifestFile {
        status.info(format!(
            "🔍 正在 {} 分支查找 {}...",
            self.reference, self.path
        ));

        let file = match remote.read(&self.path, &self.reference).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                status.info(format!(
                    "📄 {} 分支中没有 {}，将创建新清单",
                    self.reference, self.path
                ));
                return self.default_manifest(today);
            }
            Err(e) => {
                status.warn(format!("⚠️ 加载 {} 失败: {}", self.path, e));
                return self.default_manifest(today);
            }
        };

        if file.content.is_empty() {
            status.warn(format!("⚠️ 找到 {}，但内容为空", self.path));
            return self.default_manifest(today);
        }

        match self.parse(&file.content, today) {
            Ok(Parsed::Valid(manifest)) => {
                status.info(format!(
                    "📋 已从 {} 分支加载清单，共 {} 个资源",
                    self.reference,
                    manifest.total_assets()
                ));
                manifest
            }
            Ok(Parsed::InvalidAssets(manifest)) => {
                status.warn(format!(
                    "⚠️ 找到 {}，但 assets 数组缺失或无效",
                    self.path
                ));
                manifest
            }
            Err(message) => {
                status.warn(format!("⚠️ 解析 {} 失败: {}", self.path, message));
                self.default_manifest(today)
            }
        }
    }

    fn parse(&self, content: &[u8], today: NaiveDate) -> Result<Parsed, String> {
        let text = std::str::from_utf8(content).map_err(|e| e.to_string())?;
        let document: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let Value::Object(mut document) = document else {
            return Err("顶层不是对象".to_string());
        };

        let text_field = |key: &str, fallback: String| {
            document
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or(fallback)
        };
        let mut manifest = ManifestFile {
            name: text_field("name", self.library_name.clone()),
            version: text_field("version", self.library_version.clone()),
            updated: text_field("updated", format_date(today)),
            assets: Vec::new(),
        };

        // 单条记录无法识别时原样保留，只有 assets 缺失或不是数组才视为无效
        let assets = match document.remove("assets") {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .map(ManifestEntry::from_value)
                    .collect::<Vec<_>>(),
            ),
            _ => None,
        };

        Ok(match assets {
            Some(assets) => {
                manifest.assets = assets;
                Parsed::Valid(manifest)
            }
            None => Parsed::InvalidAssets(manifest),
        })
    }

    /// 按 id 合并记录：已存在则原位替换，否则追加
    pub fn upsert(mut manifest: ManifestFile, record: AssetRecord) -> ManifestFile {
        match manifest.position(&record.id) {
            Some(index) => manifest.assets[index] = record.into(),
            None => manifest.assets.push(record.into()),
        }
        manifest
    }

    /// 序列化为带缩进的 JSON（两个空格）
    pub fn serialize(manifest: &ManifestFile) -> Result<Vec<u8>, serde_json::Error> {
        let view = ManifestView {
            name: &manifest.name,
            version: &manifest.version,
            updated: &manifest.updated,
            total_assets: manifest.assets.len(),
            assets: &manifest.assets,
        };
        serde_json::to_vec_pretty(&view)
    }
}
