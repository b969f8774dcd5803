//! Route handlers

use super::AppState;
use crate::error::{Error, Result};
use crate::report::report_filename;
use crate::validate;
use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

const DEFAULT_RUNS_LIMIT: usize = 20;

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true, "version": env!("CARGO_PKG_VERSION") }))
}

/// `POST /api/inventory/upload`
pub async fn upload_inventory(State(state): State<AppState>, multipart: Multipart) -> Response {
    let result = upload(&state, multipart).await;
    state.respond(result)
}

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Bytes,
}

async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidFile(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidFile(e.body_text()))?;
        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }
    Err(Error::InvalidFile("file is required".to_string()))
}

async fn upload(state: &AppState, multipart: Multipart) -> Result<Response> {
    let upload = read_upload(multipart).await?;
    validate::upload_file(
        upload.file_name.as_deref(),
        upload.content_type.as_deref(),
        upload.bytes.len(),
        &state.config.upload,
    )
    .map_err(|e| Error::InvalidFile(e.to_string()))?;

    info!(
        file = upload.file_name.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        "Inventory upload accepted"
    );
    let result = state
        .engine
        .ingest_named(upload.file_name.as_deref(), &upload.bytes)
        .await?;

    let status = if result.errors.is_empty() {
        StatusCode::OK
    } else if result.processed_rows == 0 {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok((status, Json(result)).into_response())
}

/// `GET /api/stores/:id/report`
pub async fn store_report(State(state): State<AppState>, Path(store_id): Path<String>) -> Response {
    let result = report(&state, &store_id).await;
    state.respond(result)
}

async fn report(state: &AppState, store_id: &str) -> Result<Response> {
    let id = validate::uuid(Some(store_id), "storeId")?.to_string();
    let data = state
        .reports
        .get_store_report_data(&id)
        .await?
        .ok_or_else(|| Error::StoreNotFound(id.clone()))?;

    let bytes = state.renderer.render(&data).await?;
    let filename = report_filename(&data.store.name, Utc::now().date_naive());
    info!(store = %data.store.name, bytes = bytes.len(), "Rendered store report");

    Ok((
        [
            (CONTENT_TYPE, state.renderer.content_type().to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<usize>,
}

/// `GET /api/ingestion-runs`
pub async fn list_runs(State(state): State<AppState>, Query(query): Query<RunsQuery>) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_RUNS_LIMIT);
    let result = state
        .db
        .list_ingestion_runs(limit)
        .await
        .map(|runs| Json(runs).into_response());
    state.respond(result)
}
