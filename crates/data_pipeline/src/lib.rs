use std::path::PathBuf;

use anyhow::{Context, Result};
use models::{DateRange, MergeMode, Settings};
use tracing::info;
use utils::MergeStats;

pub mod dialect;
pub mod export;
pub mod import;
pub mod session;

pub use dialect::{Parsers, dialect_from_file_name};
pub use export::{ExportError, Exporter, JsonFileExporter, RetryPolicy, export_with_retry};
pub use import::{FileLocation, ImportError, UploadedFile, import_files};
pub use session::Session;

pub struct Config {
    pub files: Vec<PathBuf>,
    pub settings_file: Option<PathBuf>,
    /// Falls back to the settings' `default_merge_mode`.
    pub mode: Option<MergeMode>,
    pub date_range: DateRange,
}

/// A loaded session together with the settings it was built from.
pub struct Report {
    pub settings: Settings,
    pub session: Session,
    pub stats: MergeStats,
}

/// Loads settings, imports every file as one batch and applies the date filter.
pub async fn run(cfg: Config) -> Result<Report> {
    let settings = settings_loader::load_settings_or_default(cfg.settings_file.as_deref())?;
    let mode = cfg.mode.unwrap_or(settings.default_merge_mode);

    let files: Vec<UploadedFile> = cfg.files.iter().map(|p| UploadedFile::from_path(p.clone())).collect();
    info!(files = files.len(), ?mode, "importing statements");

    let mut session = Session::from_settings(&settings);
    let stats = session
        .upload(&files, mode)
        .await
        .context("Importing statements")?;

    if !cfg.date_range.is_unbounded() {
        session.set_date_range(cfg.date_range);
    }

    Ok(Report {
        settings,
        session,
        stats,
    })
}
