use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{self, AppState};

/// Statement exports covering a few years run to several megabytes.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Create the main application router with all API endpoints
pub fn create_router(state: AppState) -> Router {
    // Create CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Upload
        .route("/api/uploads", post(handlers::upload_statements))
        .route("/api/upload-status", get(handlers::get_upload_status))
        // Data and derived views
        .route(
            "/api/transactions",
            get(handlers::get_transactions).delete(handlers::clear_transactions),
        )
        .route("/api/summary", get(handlers::get_summary))
        .route(
            "/api/date-range",
            get(handlers::get_date_range).put(handlers::put_date_range),
        )
        .route("/api/categories/:type", get(handlers::get_categories))
        .route("/api/weekly", get(handlers::get_weekly))
        // Export
        .route("/api/export", post(handlers::export_report))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemorySessionRepository;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use data_pipeline::Session;
    use models::Settings;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    const BOUNDARY: &str = "ledger-test-boundary";

    const ALIPAY_CSV: &str = "\
支付宝交易记录明细查询
交易时间,交易分类,交易对方,对方账号,商品说明,收/支,金额,收/付款方式,交易状态
2025-03-30 12:01:02,餐饮美食,肯德基,/,午餐,支出,35.50,花呗,交易成功
2025-03-31 08:00:00,转账红包,李四,/,/,收入,200.00,余额,交易成功
";

    fn app_with(settings: Settings) -> Router {
        let repo = Arc::new(InMemorySessionRepository::new(Session::from_settings(&settings)));
        create_router(AppState::new(repo, settings))
    }

    fn app() -> Router {
        app_with(Settings::default())
    }

    fn multipart_body(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, bytes) in files {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(query: &str, files: &[(&str, &[u8])]) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(format!("/api/uploads{query}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(files)))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_summary_is_null_before_upload() {
        let (status, body) = send(&app(), get("/api/summary")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_upload_then_read_views() {
        let app = app();
        let (status, body) = send(
            &app,
            upload_request("", &[("alipay_march.csv", ALIPAY_CSV.as_bytes())]),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], 2);
        assert_eq!(body["has_duplicates"], false);
        assert_eq!(body["status"]["succeeded"], true);

        let (_, summary) = send(&app, get("/api/summary")).await;
        assert_eq!(summary["transaction_count"], 2);

        let (_, txns) = send(&app, get("/api/transactions")).await;
        assert_eq!(txns.as_array().unwrap().len(), 2);

        let (status, expense) = send(&app, get("/api/categories/expense")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(expense[0]["category"], "餐饮美食");

        let (_, weekly) = send(&app, get("/api/weekly")).await;
        assert_eq!(weekly.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cumulative_reupload_reports_duplicates() {
        let app = app();
        let files: &[(&str, &[u8])] = &[("alipay_march.csv", ALIPAY_CSV.as_bytes())];
        send(&app, upload_request("?mode=cumulative", files)).await;
        let (_, body) = send(&app, upload_request("?mode=cumulative", files)).await;
        assert_eq!(body["added"], 0);
        assert_eq!(body["skipped"], 2);
        assert_eq!(body["has_duplicates"], true);
    }

    #[tokio::test]
    async fn test_unknown_mode_is_bad_request() {
        let (status, body) = send(&app(), upload_request("?mode=overwrite", &[])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("overwrite"));
    }

    #[tokio::test]
    async fn test_failed_upload_is_unprocessable() {
        let app = app();
        let (status, body) = send(
            &app,
            upload_request("", &[("alipay_broken.csv", b"nothing useful here".as_slice())]),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("alipay_broken.csv"));

        let (_, upload_status) = send(&app, get("/api/upload-status")).await;
        assert_eq!(upload_status["in_flight"], false);
        assert_eq!(upload_status["succeeded"], false);
        assert!(upload_status["error_message"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_category_type_is_bad_request() {
        let (status, body) = send(&app(), get("/api/categories/transfer")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_date_range_round_trip() {
        let app = app();
        send(&app, upload_request("", &[("alipay_march.csv", ALIPAY_CSV.as_bytes())])).await;

        let put = Request::builder()
            .method(Method::PUT)
            .uri("/api/date-range")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"start":"2025-03-31","end":"2025-03-31"}"#))
            .unwrap();
        let (status, body) = send(&app, put).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["transaction_count"], 1);

        let (_, range) = send(&app, get("/api/date-range")).await;
        assert_eq!(range["start"], "2025-03-31");

        let (_, txns) = send(&app, get("/api/transactions")).await;
        assert_eq!(txns.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_date_range_is_rejected() {
        let put = Request::builder()
            .method(Method::PUT)
            .uri("/api/date-range")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"start":"2025-04-01","end":"2025-03-01"}"#))
            .unwrap();
        let (status, body) = send(&app(), put).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_clear_resets_session() {
        let app = app();
        send(&app, upload_request("", &[("alipay_march.csv", ALIPAY_CSV.as_bytes())])).await;

        let delete = Request::builder()
            .method(Method::DELETE)
            .uri("/api/transactions")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::OK);

        let (_, summary) = send(&app, get("/api/summary")).await;
        assert!(summary.is_null());
        let (_, txns) = send(&app, get("/api/transactions")).await;
        assert!(txns.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.export.output_dir = dir.path().join("exports");
        let app = app_with(settings);
        send(&app, upload_request("", &[("alipay_march.csv", ALIPAY_CSV.as_bytes())])).await;

        let post = Request::builder()
            .method(Method::POST)
            .uri("/api/export")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, post).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transaction_count"], 2);
        assert_eq!(body["currency"], "CNY");
        assert!(std::path::Path::new(body["path"].as_str().unwrap()).exists());
    }
}
