use async_trait::async_trait;
use data_pipeline::{import_files, Session, UploadedFile};
use models::{
    CategoryStats, DataSummary, DateRange, ExportSnapshot, MergeMode, Transaction, TxnType,
    UploadStatus, UploadStatusPatch, WeeklyBucket,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use utils::MergeStats;

use crate::error::Result;

/// Repository trait for the session the API serves.
/// Every mutation is applied under a single write, so readers never observe a half-applied update.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn upload(&self, files: Vec<UploadedFile>, mode: MergeMode) -> Result<MergeStats>;
    async fn upload_status(&self) -> UploadStatus;
    async fn filtered_transactions(&self) -> Vec<Transaction>;
    async fn clear(&self);
    async fn summary(&self) -> Option<DataSummary>;
    async fn date_range(&self) -> DateRange;
    async fn set_date_range(&self, range: DateRange) -> Option<DataSummary>;
    async fn category_stats(&self, kind: TxnType) -> Vec<CategoryStats>;
    async fn weekly_series(&self) -> Vec<WeeklyBucket>;
    async fn export_snapshot(&self) -> ExportSnapshot;
}

/// Single in-process session shared by every request.
pub struct InMemorySessionRepository {
    session: Arc<RwLock<Session>>,
}

impl InMemorySessionRepository {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
        }
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn upload(&self, files: Vec<UploadedFile>, mode: MergeMode) -> Result<MergeStats> {
        let parsers = {
            let mut session = self.session.write().await;
            session.begin_upload();
            session.parsers().clone()
        };

        // The lock is only held for the progress write between files.
        let result = import_files(&files, &parsers, |progress| {
            let session = Arc::clone(&self.session);
            async move {
                session.write().await.set_upload_status(UploadStatusPatch {
                    progress_percent: Some(progress),
                    ..UploadStatusPatch::default()
                });
            }
        })
        .await;

        let mut session = self.session.write().await;
        match result {
            Ok(batch) => Ok(session.commit_import(batch, mode)),
            Err(err) => {
                session.fail_upload(&err);
                Err(err.into())
            }
        }
    }

    async fn upload_status(&self) -> UploadStatus {
        self.session.read().await.upload_status().clone()
    }

    async fn filtered_transactions(&self) -> Vec<Transaction> {
        self.session.read().await.filtered_transactions().to_vec()
    }

    async fn clear(&self) {
        self.session.write().await.clear();
    }

    async fn summary(&self) -> Option<DataSummary> {
        self.session.read().await.summary().cloned()
    }

    async fn date_range(&self) -> DateRange {
        self.session.read().await.date_range()
    }

    async fn set_date_range(&self, range: DateRange) -> Option<DataSummary> {
        let mut session = self.session.write().await;
        session.set_date_range(range);
        session.summary().cloned()
    }

    async fn category_stats(&self, kind: TxnType) -> Vec<CategoryStats> {
        self.session.read().await.category_stats(kind)
    }

    async fn weekly_series(&self) -> Vec<WeeklyBucket> {
        self.session.read().await.weekly_series()
    }

    async fn export_snapshot(&self) -> ExportSnapshot {
        self.session.read().await.export_snapshot()
    }
}
