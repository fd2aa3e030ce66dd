pub mod export;
pub mod settings;

pub use export::run_export;
pub use settings::{show_settings, update_settings, SettingsUpdate};
