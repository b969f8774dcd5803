//! Report command implementation

use crate::config::Config;
use crate::db::Db;
use crate::error::{Error, Result};
use crate::report::{report_filename, LogoFetcher, PdfRenderer, ReportAssembler, ReportRenderer};
use crate::validate;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Where a report was written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    pub store_id: String,
    pub store_name: String,
    pub path: String,
    pub bytes: usize,
}

/// Render a store's PDF report to disk.
///
/// `output` may name a file or an existing directory; by default the report
/// lands in the current directory under its download name.
pub async fn cmd_report(
    config: &Config,
    db: &Db,
    store_id: &str,
    output: Option<PathBuf>,
) -> Result<ReportOutput> {
    let id = validate::uuid(Some(store_id), "store-id")?.to_string();

    let assembler = ReportAssembler::new(db, config.report.top_n);
    let data = assembler
        .get_store_report_data(&id)
        .await?
        .ok_or_else(|| Error::StoreNotFound(id.clone()))?;

    let renderer = PdfRenderer::new(LogoFetcher::new(&config.report)?);
    let bytes = renderer.render(&data).await?;

    let filename = report_filename(&data.store.name, Utc::now().date_naive());
    let path = match output {
        Some(dir) if dir.is_dir() => dir.join(filename),
        Some(file) => file,
        None => PathBuf::from(filename),
    };
    tokio::fs::write(&path, &bytes).await?;
    info!("Wrote report for {} to {}", data.store.name, path.display());

    Ok(ReportOutput {
        store_id: id,
        store_name: data.store.name,
        path: path.display().to_string(),
        bytes: bytes.len(),
    })
}

pub fn print_report_output(output: &ReportOutput) {
    println!(
        "✓ Report for {} written to {} ({} bytes)",
        output.store_name, output.path, output.bytes
    );
}
