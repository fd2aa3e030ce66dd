use assetexport_lib::core::{FrameScanner, StatusReporter};
use assetexport_lib::storage::{LocalContent, RemoteContent};
use assetexport_lib::{ExportPipeline, ExportSettings, ExportStage, Frame};
use chrono::NaiveDate;
use std::sync::Arc;

fn settings() -> ExportSettings {
    ExportSettings {
        token: "local".to_string(),
        repo: "acme/graphics".to_string(),
        branch: "main".to_string(),
        ..Default::default()
    }
}

async fn frames(dir: &std::path::Path) -> Vec<Box<dyn Frame>> {
    FrameScanner::new(dir)
        .scan()
        .await
        .unwrap()
        .into_iter()
        .map(|f| Box::new(f) as Box<dyn Frame>)
        .collect()
}

fn write_png(dir: &std::path::Path, rel: &str, bytes: &[u8]) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, bytes).unwrap();
}

#[tokio::test]
async fn test_export_then_reexport() {
    let frames_dir = tempfile::tempdir().unwrap();
    let repo_dir = tempfile::tempdir().unwrap();
    write_png(frames_dir.path(), "Icons/Home.png", b"home-v1");
    write_png(frames_dir.path(), "Logos/Acme.png", b"acme");
    write_png(frames_dir.path(), "Loose.png", b"no category");

    let remote: Arc<dyn RemoteContent> = Arc::new(LocalContent::new(repo_dir.path()).unwrap());
    let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let pipeline = ExportPipeline::new(settings(), remote.clone());
    let report = pipeline
        .run_on(&frames(frames_dir.path()).await, day1)
        .await
        .unwrap();

    assert_eq!(report.stage, ExportStage::Done);
    assert_eq!(report.new_assets, 2);
    assert_eq!(report.updated_assets, 0);
    assert_eq!(report.skipped, vec!["Loose".to_string()]);
    assert_eq!(report.uploaded, vec!["Icons/Home.png", "Logos/Acme.png"]);
    assert!(report.manifest_written);

    let stored = remote.read("Icons/Home.png", "main").await.unwrap().unwrap();
    assert_eq!(stored.content, b"home-v1");

    let manifest = remote.read("metadata.json", "main").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&manifest.content).unwrap();
    assert_eq!(json["totalAssets"], 2);
    assert_eq!(json["updated"], "2024-03-01");
    assert_eq!(json["assets"][0]["id"], "logo-Home");
    assert_eq!(json["assets"][0]["category"], "Icons");
    assert_eq!(json["assets"][0]["lastUpdated"], "2024-03-01");
    assert_eq!(
        json["assets"][1]["url"],
        "https://raw.githubusercontent.com/acme/graphics/main/Logos/Acme.png"
    );

    // 第二次导出：同名资源更新而不是新增
    write_png(frames_dir.path(), "Icons/Home.png", b"home-v2!");
    let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
    let (status, mut rx) = StatusReporter::channel();
    let pipeline = ExportPipeline::new(settings(), remote.clone()).with_status(status);
    let report = pipeline
        .run_on(&frames(frames_dir.path()).await, day2)
        .await
        .unwrap();
    drop(pipeline);

    assert!(report.is_success());
    assert_eq!(report.new_assets, 0);
    assert_eq!(report.updated_assets, 2);

    let manifest = remote.read("metadata.json", "main").await.unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&manifest.content).unwrap();
    assert_eq!(json["totalAssets"], 2);
    assert_eq!(json["updated"], "2024-03-02");
    assert_eq!(json["assets"][0]["lastUpdated"], "2024-03-02");
    let stored = remote.read("Icons/Home.png", "main").await.unwrap().unwrap();
    assert_eq!(stored.content, b"home-v2!");

    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    assert!(!updates.is_empty());
    // 只有无分类的帧会产生错误消息
    let errors: Vec<_> = updates.iter().filter(|u| u.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].text.contains("Loose"));
}

#[tokio::test]
async fn test_missing_settings_leave_repository_untouched() {
    let frames_dir = tempfile::tempdir().unwrap();
    let repo_dir = tempfile::tempdir().unwrap();
    write_png(frames_dir.path(), "Icons/Home.png", b"home");

    let remote: Arc<dyn RemoteContent> = Arc::new(LocalContent::new(repo_dir.path()).unwrap());
    let pipeline = ExportPipeline::new(
        ExportSettings {
            branch: String::new(),
            ..settings()
        },
        remote.clone(),
    );

    let result = pipeline.run(&frames(frames_dir.path()).await).await;
    assert!(result.is_err());
    assert_eq!(pipeline.stage(), ExportStage::Idle);
    assert!(remote.read("metadata.json", "main").await.unwrap().is_none());
}
