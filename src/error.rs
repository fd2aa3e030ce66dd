//! 错误类型

use thiserror::Error;

/// 远程内容操作错误
#[derive(Debug, Error)]
pub enum RemoteError {
    /// 远端版本与期望版本不一致（乐观并发冲突）
    #[error("版本冲突: {path}")]
    Conflict { path: String },

    /// 非成功的 HTTP 响应
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 网络错误
    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 内容解码失败
    #[error("内容解码失败: {0}")]
    Decode(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::Conflict { .. })
    }
}

/// 导出流程错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 前置条件不满足（配置缺失、未选择帧），不会产生任何副作用
    #[error("前置条件不满足: {0}")]
    Precondition(String),

    /// 帧渲染失败
    #[error("渲染 {frame} 失败: {message}")]
    Render { frame: String, message: String },

    /// 上传失败（冲突重试后仍失败或其他错误）
    #[error("上传 {path} 失败: {source}")]
    Upload {
        path: String,
        #[source]
        source: RemoteError,
    },

    /// 清单序列化失败
    #[error("清单序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ExportError {
    /// 失败所涉及的远程路径
    pub fn failed_path(&self) -> Option<&str> {
        match self {
            ExportError::Upload { path, .. } => Some(path),
            _ => None,
        }
    }
}
