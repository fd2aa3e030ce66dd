//! 导出命令

use crate::config::ExportSettings;
use crate::core::{ExportPipeline, ExportReport, Frame, FrameScanner, StatusLevel, StatusReporter};
use crate::storage::create_remote;
use anyhow::{Context, Result};
use std::path::Path;

/// 本地模式下不需要真实令牌
const LOCAL_TOKEN: &str = "local";

/// 扫描帧目录并导出到仓库（或本地目录）
pub async fn run_export(
    data_dir: &Path,
    frames_dir: &Path,
    local_root: Option<&Path>,
) -> Result<ExportReport> {
    let mut settings = ExportSettings::load(data_dir).with_env_token();
    if local_root.is_some() && settings.token.is_empty() {
        settings.token = LOCAL_TOKEN.to_string();
    }

    let frames: Vec<Box<dyn Frame>> = FrameScanner::new(frames_dir)
        .scan()
        .await?
        .into_iter()
        .map(|f| Box::new(f) as Box<dyn Frame>)
        .collect();

    let remote = create_remote(&settings, local_root).context("创建仓库客户端失败")?;

    let (status, mut rx) = StatusReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            match update.level {
                StatusLevel::Error => eprintln!("{}", update.text),
                _ => println!("{}", update.text),
            }
        }
    });

    let pipeline = ExportPipeline::new(settings, remote).with_status(status);
    let result = pipeline.run(&frames).await;

    // 释放发送端，等待输出结束
    drop(pipeline);
    let _ = printer.await;

    Ok(result?)
}
