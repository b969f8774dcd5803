//! Batch CSV ingestion
//!
//! An upload is buffered to a scratch file, counted, then read back in
//! fixed-size batches. Each row runs in its own transaction, so a bad row
//! is reported and skipped while every good row is committed.

mod engine;
mod reader;
mod row;
mod scratch;

pub use engine::*;
pub use reader::*;
pub use row::*;
pub use scratch::*;

use serde::{Deserialize, Serialize};

/// A row that was not ingested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 1-based line number counting the header, so the first data row is 2
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCounts {
    pub stores: usize,
    pub authors: usize,
    pub books: usize,
    pub store_books: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedCounts {
    pub store_books: usize,
}

/// Outcome of one ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// True when no row failed
    pub success: bool,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub errors: Vec<RowError>,
    pub created: CreatedCounts,
    pub updated: UpdatedCounts,
}

impl ProcessingResult {
    fn record(&mut self, outcome: RowOutcome) {
        self.processed_rows += 1;
        self.created.stores += outcome.store_created as usize;
        self.created.authors += outcome.author_created as usize;
        self.created.books += outcome.book_created as usize;
        self.created.store_books += outcome.store_book_created as usize;
        self.updated.store_books += outcome.store_book_updated as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let mut result = ProcessingResult {
            success: true,
            total_rows: 1,
            ..ProcessingResult::default()
        };
        result.record(RowOutcome {
            store_book_created: true,
            ..RowOutcome::default()
        });

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalRows"], 1);
        assert_eq!(json["processedRows"], 1);
        assert_eq!(json["created"]["storeBooks"], 1);
        assert_eq!(json["updated"]["storeBooks"], 0);
        assert!(json["errors"].as_array().unwrap().is_empty());
    }
}
