use std::future::Future;
use std::io;
use std::path::PathBuf;

use models::Transaction;
use thiserror::Error;
use tracing::info;
use utils::ParseError;

use crate::dialect::Parsers;

/// Batch-fatal failure; the message ends up in the upload status.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot read {file}: {source}")]
    FileRead {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ParseError,
    },
}

#[derive(Debug, Clone)]
pub enum FileLocation {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// A file handed in by the user. The name drives dialect selection.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub location: FileLocation,
}

impl UploadedFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            location: FileLocation::Path(path),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            location: FileLocation::Bytes(bytes),
        }
    }

    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match &self.location {
            FileLocation::Path(path) => tokio::fs::read(path).await,
            FileLocation::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Reads and parses `files` one after another.
///
/// `on_progress` receives `(index + 1) / total * 100` after each file. The first failure
/// aborts the batch; nothing parsed so far is returned.
pub async fn import_files<F, Fut>(
    files: &[UploadedFile],
    parsers: &Parsers,
    mut on_progress: F,
) -> Result<Vec<Transaction>, ImportError>
where
    F: FnMut(f64) -> Fut,
    Fut: Future<Output = ()>,
{
    let total = files.len();
    let mut batch = Vec::new();

    for (index, file) in files.iter().enumerate() {
        let bytes = file.read_bytes().await.map_err(|source| ImportError::FileRead {
            file: file.name.clone(),
            source,
        })?;

        let txns = parsers
            .parse_file(&bytes, &file.name)
            .map_err(|source| ImportError::Parse {
                file: file.name.clone(),
                source,
            })?;

        info!(file = %file.name, count = txns.len(), "imported file");
        batch.extend(txns);

        on_progress((index + 1) as f64 / total as f64 * 100.0).await;
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{ALIPAY_CSV, wechat_xlsx};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_import_reports_progress_per_file() {
        let files = vec![
            UploadedFile::from_bytes("微信支付账单.xlsx", wechat_xlsx()),
            UploadedFile::from_bytes("支付宝交易明细.csv", ALIPAY_CSV.as_bytes().to_vec()),
        ];
        let seen = Arc::new(Mutex::new(Vec::new()));

        let batch = import_files(&files, &Parsers::default(), |p| {
            seen.lock().unwrap().push(p);
            async {}
        })
        .await
        .unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![50.0, 100.0]);
    }

    #[tokio::test]
    async fn test_import_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alipay_2025.csv");
        tokio::fs::write(&path, ALIPAY_CSV).await.unwrap();

        let file = UploadedFile::from_path(&path);
        assert_eq!(file.name, "alipay_2025.csv");

        let batch = import_files(&[file], &Parsers::default(), |_| async {}).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_aborts_batch() {
        let files = vec![
            UploadedFile::from_bytes("alipay.csv", ALIPAY_CSV.as_bytes().to_vec()),
            UploadedFile::from_path("/nonexistent/alipay.csv"),
        ];
        let mut calls = 0;
        let err = import_files(&files, &Parsers::default(), |_| {
            calls += 1;
            async {}
        })
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::FileRead { ref file, .. } if file == "alipay.csv"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_parse_failure_names_the_file() {
        let files = vec![UploadedFile::from_bytes("alipay.csv", b"nothing here".to_vec())];
        let err = import_files(&files, &Parsers::default(), |_| async {}).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to parse alipay.csv"));
    }
}
