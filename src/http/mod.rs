//! HTTP API
//!
//! ## Routes
//!
//! - `GET /health`: liveness check.
//! - `POST /api/inventory/upload`: multipart upload, field `file`; returns the
//!   ingestion result as JSON with 200, 207 (some rows failed) or 400 (all
//!   rows failed).
//! - `GET /api/stores/:id/report`: PDF report for a store.
//! - `GET /api/ingestion-runs?limit=N`: recent ingestion runs.

mod handlers;

use crate::config::Config;
use crate::db::Db;
use crate::error::{Error, Result};
use crate::ingest::{IngestEngine, ScratchDir};
use crate::report::{LogoFetcher, PdfRenderer, ReportAssembler, ReportRenderer};
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Db,
    pub engine: IngestEngine,
    pub reports: ReportAssembler,
    pub renderer: Arc<dyn ReportRenderer>,
}

impl AppState {
    pub fn new(config: Config, db: Db) -> Result<Self> {
        let engine = IngestEngine::new(db.clone(), Arc::new(ScratchDir::from_config(&config)));
        let reports = ReportAssembler::new(&db, config.report.top_n);
        let renderer: Arc<dyn ReportRenderer> =
            Arc::new(PdfRenderer::new(LogoFetcher::new(&config.report)?));
        Ok(Self {
            config: Arc::new(config),
            db,
            engine,
            reports,
            renderer,
        })
    }

    /// Turn a handler outcome into a response, hiding internal details
    /// unless development mode is on
    fn respond(&self, result: Result<Response>) -> Response {
        match result {
            Ok(response) => response,
            Err(e) => error_response(&e, self.config.server.dev_mode),
        }
    }
}

/// Map an error to its HTTP status and JSON body
pub fn error_response(err: &Error, dev_mode: bool) -> Response {
    let status = match err {
        Error::Validation(_) | Error::InvalidFile(_) => StatusCode::BAD_REQUEST,
        Error::StoreNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let message = if err.is_client_error() {
        warn!("Request rejected: {}", err);
        err.to_string()
    } else {
        error!("Request failed: {}", err);
        if dev_mode {
            err.to_string()
        } else {
            "Internal server error".to_string()
        }
    };

    (status, Json(json!({ "error": message }))).into_response()
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.upload.max_bytes + MULTIPART_OVERHEAD;
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/inventory/upload",
            post(handlers::upload_inventory).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/stores/:id/report", get(handlers::store_report))
        .route("/api/ingestion-runs", get(handlers::list_runs))
        .with_state(state)
}

/// Serve the API until Ctrl-C
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
