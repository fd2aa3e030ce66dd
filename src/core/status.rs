//! 导出状态通道 - 每个关键步骤都会发送一条可读的状态消息

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// 导出流程状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Idle,
    LoadingManifest,
    Reconciling,
    UploadingAssets,
    UploadingManifest,
    Done,
    Aborted,
}

impl std::fmt::Display for ExportStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportStage::Idle => write!(f, "idle"),
            ExportStage::LoadingManifest => write!(f, "loading_manifest"),
            ExportStage::Reconciling => write!(f, "reconciling"),
            ExportStage::UploadingAssets => write!(f, "uploading_assets"),
            ExportStage::UploadingManifest => write!(f, "uploading_manifest"),
            ExportStage::Done => write!(f, "done"),
            ExportStage::Aborted => write!(f, "aborted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// 一条状态消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub stage: ExportStage,
    pub level: StatusLevel,
    pub text: String,
}

impl StatusUpdate {
    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

/// 状态发送器，同时写入 tracing 日志
///
/// 没有接收方时只写日志；接收方关闭后发送失败会被忽略。
#[derive(Debug)]
pub struct StatusReporter {
    tx: Option<mpsc::UnboundedSender<StatusUpdate>>,
    stage: Mutex<ExportStage>,
}

impl Default for StatusReporter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StatusReporter {
    pub fn new(tx: Option<mpsc::UnboundedSender<StatusUpdate>>) -> Self {
        Self {
            tx,
            stage: Mutex::new(ExportStage::Idle),
        }
    }

    /// 创建带接收端的状态通道
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(Some(tx)), rx)
    }

    pub fn stage(&self) -> ExportStage {
        *self.stage.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 切换状态并在通道上发送一条状态消息，状态未变化时不发送
    pub fn transition(&self, stage: ExportStage) {
        let previous = {
            let mut guard = self.stage.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, stage)
        };
        if previous == stage {
            return;
        }
        info!("导出状态: {} -> {}", previous, stage);
        self.send(StatusLevel::Info, format!("导出状态: {}", stage));
    }

    pub fn info(&self, text: impl Into<String>) {
        let text = text.into();
        info!("{}", text);
        self.send(StatusLevel::Info, text);
    }

    pub fn warn(&self, text: impl Into<String>) {
        let text = text.into();
        warn!("{}", text);
        self.send(StatusLevel::Warning, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        let text = text.into();
        error!("{}", text);
        self.send(StatusLevel::Error, text);
    }

    fn send(&self, level: StatusLevel, text: String) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(StatusUpdate {
                stage: self.stage(),
                level,
                text,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_carry_current_stage() {
        let (reporter, mut rx) = StatusReporter::channel();
        reporter.info("开始");
        reporter.transition(ExportStage::LoadingManifest);
        reporter.error("失败");

        let first = rx.try_recv().unwrap();
        assert_eq!(first.stage, ExportStage::Idle);
        assert!(!first.is_error());

        let second = rx.try_recv().unwrap();
        assert_eq!(second.stage, ExportStage::LoadingManifest);
        assert!(!second.is_error());

        let third = rx.try_recv().unwrap();
        assert_eq!(third.stage, ExportStage::LoadingManifest);
        assert!(third.is_error());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_repeated_transition_sends_once() {
        let (reporter, mut rx) = StatusReporter::channel();
        reporter.transition(ExportStage::Aborted);
        reporter.transition(ExportStage::Aborted);
        reporter.transition(ExportStage::Idle);

        let stages: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|u| u.stage)
            .collect();
        assert_eq!(stages, vec![ExportStage::Aborted, ExportStage::Idle]);
        assert_eq!(reporter.stage(), ExportStage::Idle);
    }

    #[test]
    fn test_without_receiver() {
        let reporter = StatusReporter::default();
        reporter.warn("只写日志");
        assert_eq!(reporter.stage(), ExportStage::Idle);
    }
}
