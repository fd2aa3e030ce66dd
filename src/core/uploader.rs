//! 上传协调 - 顺序上传，版本冲突时重试一次

use super::manifest::{ManifestFile, ManifestStore};
use super::reconciler::UploadTask;
use super::status::StatusReporter;
use crate::error::{ExportError, RemoteError};
use crate::storage::RemoteContent;

/// 批量上传结果
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// 已成功上传的路径（按上传顺序）
    pub uploaded: Vec<String>,
    /// 第一个致命错误，之后的任务不会执行
    pub failure: Option<ExportError>,
}

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}

/// 上传协调器
///
/// 所有写入都指向同一分支，因此严格按顺序执行，每个文件最多重试一次。
pub struct UploadCoordinator<'a> {
    remote: &'a dyn RemoteContent,
    branch: &'a str,
    status: &'a StatusReporter,
}

impl<'a> UploadCoordinator<'a> {
    pub fn new(remote: &'a dyn RemoteContent, branch: &'a str, status: &'a StatusReporter) -> Self {
        Self {
            remote,
            branch,
            status,
        }
    }

    /// 按顺序上传所有任务，遇到第一个致命错误即停止
    pub async fn upload_all(&self, tasks: &[UploadTask]) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();
        for task in tasks {
            match self.upload_asset(task).await {
                Ok(_) => outcome.uploaded.push(task.path.clone()),
                Err(e) => {
                    outcome.failure = Some(e);
                    break;
                }
            }
        }
        outcome
    }

    pub async fn upload_asset(&self, task: &UploadTask) -> Result<String, ExportError> {
        self.upload(&task.path, &task.bytes, &task.message).await
    }

    /// 序列化并上传清单
    pub async fn upload_manifest(
        &self,
        path: &str,
        manifest: &ManifestFile,
        new_count: usize,
        updated_count: usize,
    ) -> Result<String, ExportError> {
        let bytes = ManifestStore::serialize(manifest)?;
        let message = format!(
            "docs: update {} (+{} new, ~{} updated)",
            path, new_count, updated_count
        );
        self.upload(path, &bytes, &message).await
    }

    async fn upload(&self, path: &str, content: &[u8], message: &str) -> Result<String, ExportError> {
        self.status.info(format!("📤 正在上传 {}...", path));

        let sha = self.remote.revision(path, self.branch).await;
        match &sha {
            Some(sha) => self.status.info(format!(
                "✏️ 更新已有文件 {} (SHA: {}...)",
                path,
                short_sha(sha)
            )),
            None => self.status.info(format!("➕ 创建新文件 {}...", path)),
        }

        match self
            .remote
            .write(path, content, message, self.branch, sha.as_deref())
            .await
        {
            Ok(revision) => {
                self.status.info(format!("✅ 上传成功: {}", path));
                Ok(revision)
            }
            Err(e) if e.is_conflict() => self.retry_after_conflict(path, content, message).await,
            Err(e) => {
                self.status.error(format!("❌ 上传 {} 失败: {}", path, e));
                Err(ExportError::Upload {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
    }

    /// 冲突后重新获取版本并只重试一次
    async fn retry_after_conflict(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> Result<String, ExportError> {
        self.status.warn(format!(
            "⚠️ {} 版本冲突，正在从 {} 获取最新 SHA...",
            path, self.branch
        ));

        let Some(sha) = self.remote.revision(path, self.branch).await else {
            self.status
                .error(format!("❌ 无法获取 {} 的当前 SHA", path));
            return Err(ExportError::Upload {
                path: path.to_string(),
                source: RemoteError::Conflict {
                    path: path.to_string(),
                },
            });
        };

        self.status
            .info(format!("🔄 使用最新 SHA 重试: {}...", short_sha(&sha)));

        match self
            .remote
            .write(path, content, message, self.branch, Some(&sha))
            .await
        {
            Ok(revision) => {
                self.status.info(format!("✅ 重试后上传成功: {}", path));
                Ok(revision)
            }
            Err(e) => {
                self.status.error(format!("❌ 重试失败 {}: {}", path, e));
                Err(ExportError::Upload {
                    path: path.to_string(),
                    source: e,
                })
            }
        }
    }
}
