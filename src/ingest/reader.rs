//! Streaming CSV access to a scratch file
//!
//! Every call opens its own reader, so batches never hold more than
//! `size` rows in memory.

use crate::error::Result;
use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use std::path::Path;
use tokio::fs::File;

/// Expected columns, after header normalization
pub const COLUMNS: [&str; 7] = [
    "store_name",
    "store_address",
    "book_name",
    "pages",
    "author_name",
    "price",
    "logo",
];

/// One data row as read from the file, before validation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub store_name: Option<String>,
    pub store_address: Option<String>,
    pub book_name: Option<String>,
    pub pages: Option<String>,
    pub author_name: Option<String>,
    pub price: Option<String>,
    pub logo: Option<String>,
}

/// A row whose fields all passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRow {
    pub store_name: String,
    pub store_address: String,
    pub book_name: String,
    pub pages: i64,
    pub author_name: String,
    pub price: f64,
    pub logo: Option<String>,
}

/// Trim, lower-case and underscore a header cell
pub fn normalize_header(cell: &str) -> String {
    cell.trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Position of each expected column in the file, if present
struct ColumnMap {
    positions: [Option<usize>; 7],
}

impl ColumnMap {
    fn from_headers(headers: &ByteRecord) -> Self {
        let names: Vec<String> = headers
            .iter()
            .map(|cell| normalize_header(&String::from_utf8_lossy(cell)))
            .collect();
        let positions = COLUMNS.map(|column| names.iter().position(|n| n == column));
        Self { positions }
    }

    fn row(&self, record: &ByteRecord) -> RawRow {
        let field = |i: usize| {
            self.positions[i]
                .and_then(|pos| record.get(pos))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        };
        RawRow {
            store_name: field(0),
            store_address: field(1),
            book_name: field(2),
            pages: field(3),
            author_name: field(4),
            price: field(5),
            logo: field(6),
        }
    }
}

async fn open(path: &Path) -> Result<AsyncReader<File>> {
    let file = File::open(path).await?;
    Ok(AsyncReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .create_reader(file))
}

/// Count data rows, header excluded
pub async fn count_rows(path: &Path) -> Result<usize> {
    let mut rdr = open(path).await?;
    let mut record = ByteRecord::new();
    let mut count = 0usize;
    while rdr.read_byte_record(&mut record).await? {
        count += 1;
    }
    Ok(count)
}

/// Read up to `size` rows starting at data row index `start` (0-based).
///
/// Reading stops as soon as the batch is full.
pub async fn read_batch(path: &Path, start: usize, size: usize) -> Result<Vec<RawRow>> {
    let mut rdr = open(path).await?;
    let columns = ColumnMap::from_headers(rdr.byte_headers().await?);

    let mut record = ByteRecord::new();
    let mut index = 0usize;
    let mut rows = Vec::with_capacity(size);
    while rows.len() < size && rdr.read_byte_record(&mut record).await? {
        if index >= start {
            rows.push(columns.row(&record));
        }
        index += 1;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn numbered_csv(rows: usize) -> String {
        let mut out = String::from("store_name,store_address,book_name,pages,author_name,price,logo\n");
        for i in 0..rows {
            out.push_str(&format!("Store,Addr,Book {i},10,Author,1.00,\n"));
        }
        out
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Store Name "), "store_name");
        assert_eq!(normalize_header("AUTHOR_NAME"), "author_name");
        assert_eq!(normalize_header("\u{feff}store_name"), "store_name");
        assert_eq!(normalize_header("book  name"), "book_name");
    }

    #[tokio::test]
    async fn test_count_rows_excludes_header() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(count_rows(&write_csv(&tmp, &numbered_csv(7))).await.unwrap(), 7);
        assert_eq!(count_rows(&write_csv(&tmp, &numbered_csv(0))).await.unwrap(), 0);
        assert_eq!(count_rows(&write_csv(&tmp, "")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batches_cover_every_row_once() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, &numbered_csv(10));

        let mut seen = Vec::new();
        let mut start = 0;
        loop {
            let batch = read_batch(&path, start, 3).await.unwrap();
            if batch.is_empty() {
                break;
            }
            assert!(batch.len() <= 3);
            start += batch.len();
            seen.extend(batch.into_iter().map(|r| r.book_name.unwrap()));
        }

        let expected: Vec<String> = (0..10).map(|i| format!("Book {i}")).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_headers_are_normalized_and_reordered() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(
            &tmp,
            " Price , Store Name,Store Address,Book Name,Pages,Author Name\n\
             9.99,Corner Books,1 Main St,Dune,412,Frank Herbert\n",
        );

        let rows = read_batch(&path, 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.price.as_deref(), Some("9.99"));
        assert_eq!(row.store_name.as_deref(), Some("Corner Books"));
        assert_eq!(row.author_name.as_deref(), Some("Frank Herbert"));
        assert_eq!(row.logo, None);
    }

    #[tokio::test]
    async fn test_short_rows_leave_fields_absent() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(
            &tmp,
            "store_name,store_address,book_name,pages,author_name,price,logo\nOnly Store\n",
        );

        let rows = read_batch(&path, 0, 10).await.unwrap();
        assert_eq!(rows[0].store_name.as_deref(), Some("Only Store"));
        assert_eq!(rows[0].pages, None);
    }
}
