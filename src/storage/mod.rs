pub mod github;
pub mod local;
#[cfg(test)]
pub mod memory;

use crate::config::ExportSettings;
use crate::error::RemoteError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use github::GitHubContent;
pub use local::LocalContent;

/// 远程文件内容及其版本标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub content: Vec<u8>,
    /// 版本标识（sha），用于乐观并发控制
    pub sha: String,
}

/// 远程内容仓库接口
///
/// 所有调用都是挂起点，调用方保证同一时刻只有一个请求在进行。
#[async_trait]
pub trait RemoteContent: Send + Sync {
    /// 读取指定引用（分支）上的文件，不存在时返回 `None`
    async fn read(&self, path: &str, reference: &str) -> Result<Option<RemoteFile>, RemoteError>;

    /// 创建或更新文件，返回新的版本标识
    ///
    /// `expected` 为空表示创建文件；远端版本与 `expected` 不一致时返回
    /// [`RemoteError::Conflict`]，不做任何恢复。
    async fn write(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        expected: Option<&str>,
    ) -> Result<String, RemoteError>;

    /// 检查文件在分支上是否存在，任何失败都视为不存在
    async fn exists(&self, path: &str, branch: &str) -> bool {
        matches!(self.read(path, branch).await, Ok(Some(_)))
    }

    /// 获取文件当前版本标识，失败或不存在时返回 `None`
    async fn revision(&self, path: &str, branch: &str) -> Option<String> {
        self.read(path, branch).await.ok().flatten().map(|f| f.sha)
    }

    /// 获取存储名称（用于日志）
    fn name(&self) -> &str;
}

/// 根据配置创建远程内容实例，指定 `local_root` 时写入本地目录
pub fn create_remote(
    settings: &ExportSettings,
    local_root: Option<&Path>,
) -> Result<Arc<dyn RemoteContent>, RemoteError> {
    match local_root {
        Some(root) => {
            tracing::info!("使用本地内容目录: {}", root.display());
            Ok(Arc::new(LocalContent::new(root)?) as Arc<dyn RemoteContent>)
        }
        None => {
            tracing::info!("使用 GitHub 仓库: {}", settings.repo);
            Ok(Arc::new(GitHubContent::new(settings)?) as Arc<dyn RemoteContent>)
        }
    }
}
