//! 资源对账：根据清单和远程仓库判断每个帧是新增还是更新

use super::manifest::{format_date, AssetRecord, ManifestFile, ManifestStore};
use super::status::StatusReporter;
use crate::config::ExportSettings;
use crate::error::ExportError;
use crate::storage::RemoteContent;
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

/// 帧名称中分类与名称的分隔符
pub const NAME_SEPARATOR: &str = " / ";
/// 导出倍率
pub const EXPORT_SCALE: u32 = 8;

/// 导出图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
        }
    }
}

/// 可导出的帧（由设计工具提供）
#[async_trait]
pub trait Frame: Send + Sync {
    fn display_name(&self) -> &str;

    /// 按指定格式和倍率渲染为图片字节
    async fn render(&self, format: ImageFormat, scale: u32) -> anyhow::Result<Vec<u8>>;
}

/// 单个资源的上传任务
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub bytes: Vec<u8>,
    pub path: String,
    pub message: String,
    /// 清单和远程仓库中都不存在
    pub is_new: bool,
}

/// 对账结果
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub tasks: Vec<UploadTask>,
    pub manifest: ManifestFile,
    pub new_count: usize,
    pub updated_count: usize,
    /// 名称格式不正确而被跳过的帧
    pub skipped: Vec<String>,
}

/// 解析 `"<分类> / <名称>"`，返回 (分类, 名称)
///
/// 在第一个分隔符处拆分；任一部分为空或包含 `/` 时视为无效。
pub fn parse_frame_name(display_name: &str) -> Option<(String, String)> {
    let (category, name) = display_name.split_once(NAME_SEPARATOR)?;
    let (category, name) = (category.trim(), name.trim());
    if category.is_empty() || name.is_empty() || category.contains('/') || name.contains('/') {
        return None;
    }
    Some((category.to_string(), name.to_string()))
}

/// 资源 id 只由名称决定：不同分类下的同名资源会得到相同的 id
pub fn compute_asset_id(_category: &str, name: &str) -> String {
    format!("logo-{}", name)
}

pub fn export_path(category: &str, name: &str) -> String {
    format!("{}/{}.{}", category, name, ImageFormat::Png.extension())
}

/// 导出文件的公开访问地址
pub fn public_url(raw_base: &str, repo: &str, branch: &str, path: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        raw_base.trim_end_matches('/'),
        repo,
        branch,
        path
    )
}

/// 资源对账器
pub struct AssetReconciler<'a> {
    remote: &'a dyn RemoteContent,
    settings: &'a ExportSettings,
    status: &'a StatusReporter,
    today: NaiveDate,
}

impl<'a> AssetReconciler<'a> {
    pub fn new(
        remote: &'a dyn RemoteContent,
        settings: &'a ExportSettings,
        status: &'a StatusReporter,
        today: NaiveDate,
    ) -> Self {
        Self {
            remote,
            settings,
            status,
            today,
        }
    }

    /// 按选择顺序处理所有帧
    ///
    /// 渲染失败会立即返回错误，此时尚未上传任何内容。
    pub async fn reconcile(
        &self,
        frames: &[Box<dyn Frame>],
        mut manifest: ManifestFile,
    ) -> Result<ReconcileOutcome, ExportError> {
        let mut tasks = Vec::with_capacity(frames.len());
        let mut skipped = Vec::new();
        let mut new_count = 0;
        let mut updated_count = 0;

        for frame in frames {
            let display_name = frame.display_name();
            let Some((category, name)) = parse_frame_name(display_name) else {
                self.status.error(format!(
                    "已跳过帧 \"{}\"（名称格式应为 \"分类 / 名称\"）",
                    display_name
                ));
                skipped.push(display_name.to_string());
                continue;
            };

            let id = compute_asset_id(&category, &name);
            let file_name = format!("{}.{}", name, ImageFormat::Png.extension());
            let path = export_path(&category, &name);

            let in_manifest = manifest.contains(&id);
            self.status
                .info(format!("🔍 正在检查 {} 是否存在于仓库...", path));
            let in_remote = self.remote.exists(&path, &self.settings.branch).await;
            self.status.info(format!(
                "📋 {} 在仓库中: {}",
                path,
                if in_remote { "已存在" } else { "不存在" }
            ));

            let is_new = !in_manifest && !in_remote;
            self.status.info(format!(
                "🤔 {}: 清单中新增={}, 仓库中新增={}, 完全新增={}",
                file_name, !in_manifest, !in_remote, is_new
            ));

            if in_manifest {
                updated_count += 1;
                self.status.info(format!("🔄 更新资源: {}", file_name));
            } else {
                new_count += 1;
                self.status.info(format!(
                    "➕ 新资源: {}{}",
                    file_name,
                    if in_remote { "（文件已存在于仓库）" } else { "" }
                ));
            }

            let record = AssetRecord {
                id,
                name: name.clone(),
                tags: Vec::new(),
                category: category.clone(),
                url: public_url(
                    &self.settings.raw_base,
                    &self.settings.repo,
                    &self.settings.branch,
                    &path,
                ),
                size: String::new(),
                last_updated: format_date(self.today),
                extra: Default::default(),
            };
            manifest = ManifestStore::upsert(manifest, record);

            self.status.info(format!("📸 正在导出 {}...", file_name));
            let bytes = frame
                .render(ImageFormat::Png, EXPORT_SCALE)
                .await
                .map_err(|e| ExportError::Render {
                    frame: display_name.to_string(),
                    message: e.to_string(),
                })?;
            debug!("{} 渲染完成 ({} 字节)", file_name, bytes.len());

            let message = if in_manifest {
                format!("feat: update asset {}", file_name)
            } else {
                format!("feat: add new asset {}", file_name)
            };

            tasks.push(UploadTask {
                bytes,
                path,
                message,
                is_new,
            });
        }

        Ok(ReconcileOutcome {
            tasks,
            manifest,
            new_count,
            updated_count,
            skipped,
        })
    }
}
