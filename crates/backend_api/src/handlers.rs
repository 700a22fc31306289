use axum::{
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    Json,
};
use data_pipeline::{export_with_retry, JsonFileExporter, RetryPolicy, UploadedFile};
use models::{DataSummary, DateRange, MergeMode, Settings, TxnType, UploadStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::{error::ApiError, repository::SessionRepository, Result};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn SessionRepository>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(repo: Arc<dyn SessionRepository>, settings: Settings) -> Self {
        Self {
            repo,
            settings: Arc::new(settings),
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "billing-ledger-api"
    }))
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub mode: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub added: usize,
    pub skipped: usize,
    pub total: usize,
    pub has_duplicates: bool,
    pub status: UploadStatus,
}

/// POST /api/uploads?mode=cumulative|replace
/// Imports every file part of the multipart body as one batch.
/// Without `mode` the configured default merge mode applies.
pub async fn upload_statements(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mode = match query.mode.as_deref() {
        Some(raw) => raw.parse::<MergeMode>().map_err(ApiError::BadRequest)?,
        None => state.settings.default_merge_mode,
    };

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        // Plain form fields carry no file name.
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        files.push(UploadedFile::from_bytes(name, bytes.to_vec()));
    }

    info!(files = files.len(), ?mode, "upload received");
    let stats = state.repo.upload(files, mode).await?;

    Ok(Json(UploadResponse {
        added: stats.added,
        skipped: stats.skipped,
        total: stats.total,
        has_duplicates: stats.has_duplicates(),
        status: state.repo.upload_status().await,
    }))
}

/// GET /api/upload-status
pub async fn get_upload_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.repo.upload_status().await)
}

/// GET /api/transactions
/// Returns the transactions inside the current date range
pub async fn get_transactions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.repo.filtered_transactions().await)
}

/// DELETE /api/transactions
/// Drops all loaded data, the date range and the upload status
pub async fn clear_transactions(State(state): State<AppState>) -> impl IntoResponse {
    state.repo.clear().await;

    Json(serde_json::json!({
        "status": "success",
        "message": "All transactions cleared."
    }))
}

/// GET /api/summary
/// `null` until something was uploaded
pub async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.repo.summary().await)
}

/// GET /api/date-range
pub async fn get_date_range(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.repo.date_range().await)
}

#[derive(Debug, Serialize)]
pub struct DateRangeResponse {
    pub date_range: DateRange,
    pub summary: Option<DataSummary>,
}

/// PUT /api/date-range
/// Sets the filter and returns the summary of the newly filtered set
pub async fn put_date_range(
    State(state): State<AppState>,
    Json(range): Json<DateRange>,
) -> Result<impl IntoResponse> {
    if let (Some(start), Some(end)) = (range.start, range.end) {
        if start > end {
            return Err(ApiError::InvertedDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
    }

    let summary = state.repo.set_date_range(range).await;
    Ok(Json(DateRangeResponse {
        date_range: range,
        summary,
    }))
}

/// GET /api/categories/:type
/// Category breakdown of the filtered set for `income` or `expense`
pub async fn get_categories(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse> {
    let kind = kind.parse::<TxnType>().map_err(ApiError::BadRequest)?;
    Ok(Json(state.repo.category_stats(kind).await))
}

/// GET /api/weekly
pub async fn get_weekly(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.repo.weekly_series().await)
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub path: String,
    pub generated_at: String,
    pub currency: String,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_income: Decimal,
    pub transaction_count: usize,
    pub date_range_label: String,
}

/// POST /api/export
/// Writes the export file into the configured directory, retrying on failure
pub async fn export_report(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let snapshot = state.repo.export_snapshot().await;
    let exporter = JsonFileExporter::new(state.settings.export.output_dir.clone());
    let policy = RetryPolicy::from(&state.settings.export);

    let path = export_with_retry(&exporter, &snapshot, policy).await?;

    Ok(Json(ExportResponse {
        path: path.display().to_string(),
        generated_at: snapshot.generated_at,
        currency: snapshot.currency,
        total_income: snapshot.total_income,
        total_expense: snapshot.total_expense,
        net_income: snapshot.net_income,
        transaction_count: snapshot.transaction_count,
        date_range_label: snapshot.date_range_label,
    }))
}
