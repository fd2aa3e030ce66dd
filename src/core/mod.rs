pub mod engine;
pub mod manifest;
pub mod reconciler;
pub mod scanner;
pub mod status;
pub mod uploader;

pub use engine::{ExportPipeline, ExportReport};
pub use manifest::{AssetRecord, ManifestEntry, ManifestFile, ManifestStore};
pub use reconciler::{
    compute_asset_id, export_path, parse_frame_name, AssetReconciler, Frame, ImageFormat,
    ReconcileOutcome, UploadTask,
};
pub use scanner::{FileFrame, FrameScanner};
pub use status::{ExportStage, StatusLevel, StatusReporter, StatusUpdate};
pub use uploader::{UploadCoordinator, UploadOutcome};
