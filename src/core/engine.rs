use crate::config::ExportSettings;
use crate::core::manifest::{format_date, ManifestStore};
use crate::core::reconciler::{AssetReconciler, Frame};
use crate::core::status::{ExportStage, StatusReporter};
use crate::core::uploader::UploadCoordinator;
use crate::error::ExportError;
use crate::storage::RemoteContent;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// 导出报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub run_id: String,
    pub stage: ExportStage,
    pub start_time: i64,
    pub end_time: i64,
    pub new_assets: usize,
    pub updated_assets: usize,
    /// 名称无效而被跳过的帧
    pub skipped: Vec<String>,
    /// 已上传的资源路径（失败时仍保留在仓库中）
    pub uploaded: Vec<String>,
    pub failed_path: Option<String>,
    pub manifest_written: bool,
    pub errors: Vec<String>,
}

impl ExportReport {
    fn new(run_id: String, start_time: i64) -> Self {
        Self {
            run_id,
            stage: ExportStage::Idle,
            start_time,
            end_time: start_time,
            new_assets: 0,
            updated_assets: 0,
            skipped: Vec::new(),
            uploaded: Vec::new(),
            failed_path: None,
            manifest_written: false,
            errors: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.stage == ExportStage::Done
    }
}

/// 导出流水线
///
/// Idle -> LoadingManifest -> Reconciling -> UploadingAssets -> UploadingManifest -> Done，
/// 加载清单之后的任何致命错误都会进入 Aborted。
pub struct ExportPipeline {
    settings: ExportSettings,
    remote: Arc<dyn RemoteContent>,
    status: StatusReporter,
}

impl ExportPipeline {
    pub fn new(settings: ExportSettings, remote: Arc<dyn RemoteContent>) -> Self {
        Self {
            settings,
            remote,
            status: StatusReporter::default(),
        }
    }

    pub fn with_status(mut self, status: StatusReporter) -> Self {
        self.status = status;
        self
    }

    pub fn stage(&self) -> ExportStage {
        self.status.stage()
    }

    /// 以当天（UTC）日期运行导出
    pub async fn run(&self, frames: &[Box<dyn Frame>]) -> Result<ExportReport, ExportError> {
        self.run_on(frames, chrono::Utc::now().date_naive()).await
    }

    /// 运行导出
    ///
    /// 前置条件不满足时返回错误且没有任何副作用；运行中的失败体现在报告的 `stage` 中。
    pub async fn run_on(
        &self,
        frames: &[Box<dyn Frame>],
        today: NaiveDate,
    ) -> Result<ExportReport, ExportError> {
        if let Err(e) = self.check_preconditions(frames) {
            self.status.transition(ExportStage::Idle);
            self.status.error(format!("错误: {}", e));
            return Err(e);
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("export", run_id = %run_id);
        self.execute(run_id, frames, today).instrument(span).await
    }

    fn check_preconditions(&self, frames: &[Box<dyn Frame>]) -> Result<(), ExportError> {
        self.settings.validate()?;
        if frames.is_empty() {
            return Err(ExportError::Precondition("请至少选择一个帧".to_string()));
        }
        Ok(())
    }

    async fn execute(
        &self,
        run_id: String,
        frames: &[Box<dyn Frame>],
        today: NaiveDate,
    ) -> Result<ExportReport, ExportError> {
        let mut report = ExportReport::new(run_id, chrono::Utc::now().timestamp());
        let remote = self.remote.as_ref();
        let branch = self.settings.branch.as_str();

        info!(
            "开始导出 {} 个帧到 {} ({})",
            frames.len(),
            self.settings.repo,
            remote.name()
        );

        // 1. 加载清单
        self.status.transition(ExportStage::LoadingManifest);
        self.status.info(format!("📥 正在加载 {}...", self.settings.manifest_path));
        let store = ManifestStore::new(&self.settings);
        let manifest = store.load(remote, &self.status, today).await;

        // 2. 对账
        self.status.transition(ExportStage::Reconciling);
        let reconciler = AssetReconciler::new(remote, &self.settings, &self.status, today);
        let outcome = match reconciler.reconcile(frames, manifest).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.status.error(format!("❌ {}，停止导出", e));
                return Ok(self.abort(report, e));
            }
        };
        report.new_assets = outcome.new_count;
        report.updated_assets = outcome.updated_count;
        report.skipped = outcome.skipped;

        // 3. 顺序上传图片
        self.status.transition(ExportStage::UploadingAssets);
        self.status
            .info(format!("🚀 正在上传 {} 个图片...", outcome.tasks.len()));
        let coordinator = UploadCoordinator::new(remote, branch, &self.status);
        let uploads = coordinator.upload_all(&outcome.tasks).await;
        report.uploaded = uploads.uploaded;
        if let Some(e) = uploads.failure {
            self.status.error(format!(
                "上传 {} 时发生严重错误，停止导出",
                e.failed_path().unwrap_or_default()
            ));
            return Ok(self.abort(report, e));
        }

        // 4. 全部成功后才写入清单
        self.status.transition(ExportStage::UploadingManifest);
        self.status
            .info(format!("📝 正在更新 {}...", store.path()));
        let mut manifest = outcome.manifest;
        manifest.updated = format_date(today);
        if let Err(e) = coordinator
            .upload_manifest(store.path(), &manifest, report.new_assets, report.updated_assets)
            .await
        {
            self.status
                .error(format!("❌ 写入 {} 失败: {}", store.path(), e));
            return Ok(self.abort(report, e));
        }
        report.manifest_written = true;

        self.status.transition(ExportStage::Done);
        self.status.info(format!(
            "✅ 导出完成！新增: {}，更新: {}",
            report.new_assets, report.updated_assets
        ));

        report.stage = ExportStage::Done;
        report.end_time = chrono::Utc::now().timestamp();
        Ok(report)
    }

    fn abort(&self, mut report: ExportReport, error: ExportError) -> ExportReport {
        self.status.transition(ExportStage::Aborted);
        report.stage = ExportStage::Aborted;
        report.failed_path = error.failed_path().map(str::to_string);
        report.errors.push(error.to_string());
        report.end_time = chrono::Utc::now().timestamp();
        report
    }
}
