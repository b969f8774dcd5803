//! Batch ingestion engine

use super::reader::{self, RawRow};
use super::row::{process_row, RowOutcome};
use super::scratch::{ScratchFile, ScratchSpace};
use super::{ProcessingResult, RowError};
use crate::db::Db;
use crate::error::Result;
use crate::gateway::Gateways;
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::validate;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rows read from the scratch file per batch
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Ingests uploaded inventory files
#[derive(Clone)]
pub struct IngestEngine {
    db: Db,
    gateways: Gateways,
    scratch: Arc<dyn ScratchSpace>,
    batch_size: usize,
    show_progress: bool,
    record_runs: bool,
}

impl IngestEngine {
    pub fn new(db: Db, scratch: Arc<dyn ScratchSpace>) -> Self {
        let gateways = Gateways::new(&db);
        Self {
            db,
            gateways,
            scratch,
            batch_size: DEFAULT_BATCH_SIZE,
            show_progress: false,
            record_runs: true,
        }
    }

    /// Override the number of rows read per batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Draw a progress bar while rows are processed
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Record each ingestion in the `ingestion_runs` table
    pub fn with_run_audit(mut self, record: bool) -> Self {
        self.record_runs = record;
        self
    }

    /// Ingest an uploaded file's bytes
    pub async fn ingest(&self, bytes: &[u8]) -> Result<ProcessingResult> {
        self.ingest_named(None, bytes).await
    }

    /// Ingest an uploaded file's bytes, recording `file_name` in the run audit
    pub async fn ingest_named(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<ProcessingResult> {
        let run_id = self.start_run(file_name).await;
        let started = Instant::now();

        let outcome = self.ingest_buffered(bytes).await;

        match &outcome {
            Ok(result) => {
                info!(
                    total = result.total_rows,
                    processed = result.processed_rows,
                    errors = result.errors.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Ingestion finished"
                );
                if let Some(id) = &run_id {
                    if let Err(e) = self.db.complete_ingestion_run(id, result).await {
                        warn!(run = %id, "Failed to record ingestion run: {}", e);
                    }
                }
            }
            Err(err) => {
                if let Some(id) = &run_id {
                    if let Err(e) = self.db.fail_ingestion_run(id, &err.to_string()).await {
                        warn!(run = %id, "Failed to record ingestion run: {}", e);
                    }
                }
            }
        }

        outcome
    }

    async fn start_run(&self, file_name: Option<&str>) -> Option<String> {
        if !self.record_runs {
            return None;
        }
        match self.db.start_ingestion_run(file_name).await {
            Ok(run) => Some(run.id),
            Err(e) => {
                warn!("Failed to record ingestion run: {}", e);
                None
            }
        }
    }

    async fn ingest_buffered(&self, bytes: &[u8]) -> Result<ProcessingResult> {
        self.with_scratch_file(bytes, |path| async move { self.process_file(&path).await })
            .await
    }

    /// Run `process` against `bytes` buffered in a scratch file, then remove
    /// the file whether or not `process` succeeded
    async fn with_scratch_file<T, F, Fut>(&self, bytes: &[u8], process: F) -> Result<T>
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let scratch = ScratchFile::create(self.scratch.as_ref(), bytes).await?;
        let outcome = process(scratch.path().to_path_buf()).await;
        scratch.release().await;
        outcome
    }

    async fn process_file(&self, path: &Path) -> Result<ProcessingResult> {
        let total_rows = reader::count_rows(path).await?;
        let mut result = ProcessingResult {
            total_rows,
            ..ProcessingResult::default()
        };

        if total_rows == 0 {
            info!("Upload contains no data rows");
            result.success = true;
            return Ok(result);
        }

        let total_batches = total_rows.div_ceil(self.batch_size);
        info!(
            rows = total_rows,
            batches = total_batches,
            batch_size = self.batch_size,
            "Starting ingestion"
        );

        let pb = if self.show_progress {
            start_progress_bar(total_rows, "Ingesting rows")
        } else {
            None
        };

        for batch in 0..total_batches {
            let start = batch * self.batch_size;
            let rows = reader::read_batch(path, start, self.batch_size).await?;
            debug!(batch = batch + 1, of = total_batches, rows = rows.len(), "Processing batch");

            for (offset, raw) in rows.iter().enumerate() {
                let row_number = start + offset + 2;
                match self.process_one(raw).await {
                    Ok(outcome) => result.record(outcome),
                    Err(message) => {
                        debug!(row = row_number, "Row rejected: {}", message);
                        result.errors.push(RowError {
                            row: row_number,
                            message,
                        });
                    }
                }
                advance_progress(&pb);
            }
        }

        finish_progress(pb, "Ingestion complete");
        result.success = result.errors.is_empty();
        Ok(result)
    }

    /// Validate and apply one row inside its own transaction
    async fn process_one(&self, raw: &RawRow) -> std::result::Result<RowOutcome, String> {
        let mut tx = self.db.begin().await.map_err(|e| e.to_string())?;

        let row = match validate::inventory_row(raw) {
            Ok(row) => row,
            Err(message) => {
                if let Err(e) = tx.rollback().await {
                    warn!("Rollback failed: {}", e);
                }
                return Err(message);
            }
        };

        match process_row(&self.gateways, &mut tx, &row).await {
            Ok(outcome) => {
                tx.commit().await.map_err(|e| e.to_string())?;
                Ok(outcome)
            }
            Err(err) => {
                if let Err(e) = tx.rollback().await {
                    warn!("Rollback failed: {}", e);
                }
                Err(err.to_string())
            }
        }
    }
}
