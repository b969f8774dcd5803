//! Runs command implementation

use crate::db::{Db, IngestionRun};
use crate::error::Result;

/// List recent ingestion runs, newest first
pub async fn cmd_runs(db: &Db, limit: usize) -> Result<Vec<IngestionRun>> {
    db.list_ingestion_runs(limit).await
}

pub fn print_runs(runs: &[IngestionRun]) {
    println!("\n📦 Ingestion Runs\n");

    if runs.is_empty() {
        println!("No ingestion runs recorded. Use 'stockroom ingest' to load a file.");
        return;
    }

    for run in runs {
        println!(
            "• {} [{}]",
            run.file_name.as_deref().unwrap_or("(upload)"),
            run.status
        );
        println!("  ID: {}", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(done) = &run.completed_at {
            println!("  Completed: {}", done);
        }
        println!(
            "  Rows: {}/{} processed, stores +{}, authors +{}, books +{}, stock +{} / ~{}",
            run.processed_rows,
            run.total_rows,
            run.stores_created,
            run.authors_created,
            run.books_created,
            run.store_books_created,
            run.store_books_updated
        );
        println!();
    }
}
