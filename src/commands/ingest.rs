//! Ingest command implementation

use crate::config::Config;
use crate::db::Db;
use crate::error::{Error, Result};
use crate::ingest::{IngestEngine, ProcessingResult, ScratchDir};
use crate::validate;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Ingest a local CSV file, applying the same checks as an HTTP upload
pub async fn cmd_ingest(
    config: &Config,
    db: &Db,
    path: &Path,
    show_progress: bool,
) -> Result<ProcessingResult> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidFile(format!("Not a file: {}", path.display())))?;

    let bytes = tokio::fs::read(path).await?;
    validate::upload_file(Some(&file_name), None, bytes.len(), &config.upload)
        .map_err(|e| Error::InvalidFile(e.to_string()))?;

    info!("Ingesting {}", path.display());
    let engine = IngestEngine::new(db.clone(), Arc::new(ScratchDir::from_config(config)))
        .with_progress(show_progress);
    engine.ingest_named(Some(&file_name), &bytes).await
}

/// Print an ingestion result to console
pub fn print_ingest_result(result: &ProcessingResult) {
    let headline = if result.success {
        "✓ Ingestion complete"
    } else if result.processed_rows > 0 {
        "⚠ Ingestion partially complete"
    } else {
        "✗ Ingestion failed"
    };
    println!("\n{}\n", headline);
    println!(
        "Rows: {} processed of {}",
        result.processed_rows, result.total_rows
    );
    println!("\nCreated:");
    println!("  Stores: {}", result.created.stores);
    println!("  Authors: {}", result.created.authors);
    println!("  Books: {}", result.created.books);
    println!("  Stock records: {}", result.created.store_books);
    println!("\nUpdated:");
    println!("  Stock records: {}", result.updated.store_books);

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for err in &result.errors {
            println!("  Row {}: {}", err.row, err.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_cmd_ingest() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_base_dir(tmp.path());
        let db = Db::connect(&config).await.unwrap();

        let csv = tmp.path().join("stock.csv");
        std::fs::write(
            &csv,
            "store_name,store_address,book_name,pages,author_name,price,logo\n\
             Corner,1 Main St,Dune,412,Frank Herbert,9.99,\n",
        )
        .unwrap();

        let result = cmd_ingest(&config, &db, &csv, false).await.unwrap();
        assert!(result.success);
        assert_eq!(result.processed_rows, 1);
    }

    #[tokio::test]
    async fn test_cmd_ingest_rejects_wrong_extension() {
        let tmp = TempDir::new().unwrap();
        let config = Config::with_base_dir(tmp.path());
        let db = Db::connect(&config).await.unwrap();

        let path = tmp.path().join("stock.json");
        std::fs::write(&path, "{}").unwrap();

        let err = cmd_ingest(&config, &db, &path, false).await.unwrap_err();
        assert!(matches!(err, Error::InvalidFile(_)));
    }
}
