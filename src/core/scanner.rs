//! 目录帧来源 - 将 `<dir>/<分类>/<名称>.png` 作为已渲染好的帧

use super::reconciler::{Frame, ImageFormat, NAME_SEPARATOR};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 磁盘上的一个已渲染帧
#[derive(Debug, Clone)]
pub struct FileFrame {
    display_name: String,
    path: PathBuf,
}

impl FileFrame {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Frame for FileFrame {
    fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 文件已由设计工具按导出倍率渲染，这里只读取字节
    async fn render(&self, format: ImageFormat, _scale: u32) -> Result<Vec<u8>> {
        let matches_format = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(format.extension()));
        if !matches_format {
            anyhow::bail!("{} 不是 {} 文件", self.path.display(), format.extension());
        }

        tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("读取 {} 失败", self.path.display()))
    }
}

/// 帧目录扫描器
pub struct FrameScanner {
    root: PathBuf,
}

impl FrameScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 扫描 PNG 文件，按路径排序
    ///
    /// 根目录下的文件没有分类，名称中不含分隔符，会在对账时被跳过。
    pub async fn scan(&self) -> Result<Vec<FileFrame>> {
        let root = self.root.clone();
        if !root.is_dir() {
            anyhow::bail!("帧目录不存在: {}", root.display());
        }

        let frames = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .min_depth(1)
                .max_depth(2)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    let path = entry.path();
                    let is_png = path
                        .extension()
                        .and_then(|e| e.to_str())
                        .is_some_and(|e| e.eq_ignore_ascii_case("png"));
                    if !is_png {
                        return None;
                    }

                    let stem = path.file_stem()?.to_str()?.to_string();
                    let relative = path.strip_prefix(&root).ok()?;
                    let display_name = match relative.parent().and_then(|p| p.to_str()) {
                        Some(category) if !category.is_empty() => {
                            format!("{}{}{}", category, NAME_SEPARATOR, stem)
                        }
                        _ => stem,
                    };

                    Some(FileFrame {
                        display_name,
                        path: path.to_path_buf(),
                    })
                })
                .collect::<Vec<_>>()
        })
        .await?;

        debug!("扫描到 {} 个帧: {}", frames.len(), self.root.display());
        Ok(frames)
    }
}
