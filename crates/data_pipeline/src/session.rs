use dashboard_engine::{
    build_export_snapshot, filter_by_date_range, generate_category_stats, generate_data_summary,
    generate_weekly_series,
};
use models::{
    CategoryStats, DataSummary, DateRange, ExportSnapshot, MergeMode, Settings, Transaction,
    TxnType, UploadStatus, UploadStatusPatch, WeeklyBucket,
};
use tracing::{info, warn};
use utils::{MergeStats, merge_transactions};

use crate::dialect::Parsers;
use crate::import::{ImportError, UploadedFile, import_files};

/// Everything one user has loaded, plus the derived views of it.
///
/// `filtered` and `summary` are always recomputed together from `transactions` and
/// `date_range`; no method leaves them half-updated.
#[derive(Debug, Clone, Default)]
pub struct Session {
    transactions: Vec<Transaction>,
    filtered: Vec<Transaction>,
    summary: Option<DataSummary>,
    date_range: DateRange,
    upload_status: UploadStatus,
    parsers: Parsers,
}

impl Session {
    pub fn new(parsers: Parsers) -> Self {
        Self {
            parsers,
            ..Self::default()
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Parsers::from_settings(settings))
    }

    pub fn parsers(&self) -> &Parsers {
        &self.parsers
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn filtered_transactions(&self) -> &[Transaction] {
        &self.filtered
    }

    /// `None` until something was uploaded or a filter applied.
    pub fn summary(&self) -> Option<&DataSummary> {
        self.summary.as_ref()
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn upload_status(&self) -> &UploadStatus {
        &self.upload_status
    }

    /// Imports a batch and merges it in one step.
    ///
    /// On failure the transaction set is left exactly as it was and the error message
    /// lands in the upload status.
    pub async fn upload(
        &mut self,
        files: &[UploadedFile],
        mode: MergeMode,
    ) -> Result<MergeStats, ImportError> {
        self.begin_upload();

        let parsers = &self.parsers;
        let status = &mut self.upload_status;
        let result = import_files(files, parsers, |progress| {
            status.progress_percent = progress;
            async {}
        })
        .await;

        match result {
            Ok(batch) => Ok(self.commit_import(batch, mode)),
            Err(err) => {
                self.fail_upload(&err);
                Err(err)
            }
        }
    }

    /// Marks an upload as started.
    pub fn begin_upload(&mut self) {
        self.upload_status = UploadStatus {
            in_flight: true,
            progress_percent: 0.0,
            error_message: None,
            succeeded: false,
        };
    }

    /// Merges a fully parsed batch against the transactions held right now and
    /// refreshes every derived view.
    pub fn commit_import(&mut self, batch: Vec<Transaction>, mode: MergeMode) -> MergeStats {
        let (merged, stats) = merge_transactions(&self.transactions, batch, mode);
        info!(
            ?mode,
            total = stats.total,
            added = stats.added,
            skipped = stats.skipped,
            held = merged.len(),
            "merged upload"
        );

        self.transactions = merged;
        self.refresh_views();
        self.upload_status.apply(UploadStatusPatch {
            in_flight: Some(false),
            progress_percent: Some(100.0),
            error_message: Some(None),
            succeeded: Some(true),
        });
        stats
    }

    pub fn fail_upload(&mut self, err: &ImportError) {
        warn!(error = %err, "upload failed");
        self.upload_status.apply(UploadStatusPatch {
            in_flight: Some(false),
            error_message: Some(Some(err.to_string())),
            succeeded: Some(false),
            ..UploadStatusPatch::default()
        });
    }

    /// Drops all data, the filter and the upload status.
    pub fn clear(&mut self) {
        self.transactions.clear();
        self.filtered.clear();
        self.summary = None;
        self.date_range = DateRange::default();
        self.upload_status = UploadStatus::default();
    }

    /// Sets the filter and recomputes the filtered set and its summary.
    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
        self.refresh_views();
    }

    pub fn set_upload_status(&mut self, patch: UploadStatusPatch) {
        self.upload_status.apply(patch);
    }

    pub fn category_stats(&self, kind: TxnType) -> Vec<CategoryStats> {
        generate_category_stats(&self.filtered, kind)
    }

    pub fn weekly_series(&self) -> Vec<WeeklyBucket> {
        generate_weekly_series(&self.filtered)
    }

    /// Snapshot of the filtered set, or of everything when the filter matches nothing.
    pub fn export_snapshot(&self) -> ExportSnapshot {
        if self.filtered.is_empty() {
            build_export_snapshot(&self.transactions)
        } else {
            build_export_snapshot(&self.filtered)
        }
    }

    fn refresh_views(&mut self) {
        let filtered = filter_by_date_range(&self.transactions, &self.date_range);
        self.summary = Some(generate_data_summary(&filtered));
        self.filtered = filtered;
    }
}
