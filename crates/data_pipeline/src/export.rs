use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use models::{ExportSettings, ExportSnapshot};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for a finished report.
#[async_trait]
pub trait Exporter: Send + Sync {
    /// Writes one snapshot and returns where it went.
    async fn export(&self, snapshot: &ExportSnapshot) -> Result<PathBuf, ExportError>;
}

/// Writes `billing_report_<timestamp>.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileExporter {
    pub output_dir: PathBuf,
}

impl JsonFileExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn file_name() -> String {
        format!("billing_report_{}.json", Local::now().format("%Y%m%d_%H%M%S"))
    }
}

#[async_trait]
impl Exporter for JsonFileExporter {
    async fn export(&self, snapshot: &ExportSnapshot) -> Result<PathBuf, ExportError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(Self::file_name());
        let json = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(1000),
        }
    }
}

impl From<&ExportSettings> for RetryPolicy {
    fn from(settings: &ExportSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff: Duration::from_millis(settings.backoff_ms),
        }
    }
}

/// Runs the exporter at most `max_retries + 1` times, sleeping `backoff` between
/// attempts. The last error is returned once attempts run out.
pub async fn export_with_retry(
    exporter: &dyn Exporter,
    snapshot: &ExportSnapshot,
    policy: RetryPolicy,
) -> Result<PathBuf, ExportError> {
    let mut attempt: u32 = 0;
    loop {
        match exporter.export(snapshot).await {
            Ok(path) => {
                info!(path = %path.display(), attempt = attempt + 1, "report exported");
                return Ok(path);
            }
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                warn!(
                    error = %err,
                    retry = attempt,
                    max_retries = policy.max_retries,
                    "export failed, retrying"
                );
                tokio::time::sleep(policy.backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}
