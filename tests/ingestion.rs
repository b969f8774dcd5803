//! End-to-end ingestion properties against a real SQLite file.

use std::sync::Arc;

use stockroom::db::Db;
use stockroom::gateway::{
    AuthorCriteria, BookCriteria, Gateway, Gateways, StoreBookCriteria, StoreBookPatch,
    StoreCriteria,
};
use stockroom::ingest::{IngestEngine, ScratchDir, DEFAULT_BATCH_SIZE};
use tempfile::TempDir;

const HEADER: &str = "store_name,store_address,book_name,pages,author_name,price,logo\n";

struct Harness {
    db: Db,
    gateways: Gateways,
    tmp: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let db = Db::open(&tmp.path().join("inventory.db")).await.unwrap();
        let gateways = Gateways::new(&db);
        Self { db, gateways, tmp }
    }

    fn engine(&self) -> IngestEngine {
        let scratch = Arc::new(ScratchDir::new(self.tmp.path().join("scratch")));
        IngestEngine::new(self.db.clone(), scratch)
    }

    fn scratch_files(&self) -> usize {
        std::fs::read_dir(self.tmp.path().join("scratch"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

fn csv(rows: &[&str]) -> String {
    let mut out = HEADER.to_string();
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out
}

#[tokio::test]
async fn fully_new_row_creates_one_of_each() {
    let h = Harness::new().await;

    let result = h
        .engine()
        .ingest(csv(&["Corner Books,1 Main St,Dune,412,Frank Herbert,9.99,"]).as_bytes())
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.total_rows, 1);
    assert_eq!(result.processed_rows, 1);
    assert_eq!(result.created.stores, 1);
    assert_eq!(result.created.authors, 1);
    assert_eq!(result.created.books, 1);
    assert_eq!(result.created.store_books, 1);
    assert_eq!(result.updated.store_books, 0);

    let stock = h
        .gateways
        .store_books
        .find_all(&StoreBookCriteria::default(), None)
        .await
        .unwrap();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].copies, 1);
    assert!(!stock[0].sold_out);
    assert_eq!(h.scratch_files(), 0);
}

#[tokio::test]
async fn repeat_row_restocks_and_takes_new_price() {
    let h = Harness::new().await;
    let engine = h.engine();

    engine
        .ingest(csv(&["Corner Books,1 Main St,Dune,412,Frank Herbert,9.99,"]).as_bytes())
        .await
        .unwrap();
    let second = engine
        .ingest(csv(&["  Corner Books ,1 Main St, Dune ,412,Frank Herbert,14.50,"]).as_bytes())
        .await
        .unwrap();

    assert!(second.success);
    assert_eq!(second.created.stores, 0);
    assert_eq!(second.created.authors, 0);
    assert_eq!(second.created.books, 0);
    assert_eq!(second.created.store_books, 0);
    assert_eq!(second.updated.store_books, 1);

    let stock = h
        .gateways
        .store_books
        .find_all(&StoreBookCriteria::default(), None)
        .await
        .unwrap();
    assert_eq!(stock.len(), 1);
    assert_eq!(stock[0].copies, 2);
    assert_eq!(stock[0].price, 14.5);
}

#[tokio::test]
async fn bad_row_is_reported_and_others_commit() {
    let h = Harness::new().await;

    let result = h
        .engine()
        .ingest(
            csv(&[
                "S,A,One,10,Au,1.00,",
                "S,A,Two,10,Au,1.00,",
                "S,A,Three,-1,Au,1.00,",
                "S,A,Four,10,Au,1.00,",
                "S,A,Five,10,Au,1.00,",
            ])
            .as_bytes(),
        )
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.processed_rows, 4);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].row, 4);
    assert!(result.errors[0].message.contains("pages"));

    let three = BookCriteria {
        name: Some("Three".to_string()),
        ..BookCriteria::default()
    };
    assert_eq!(h.gateways.books.count(&three, None).await.unwrap(), 0);
    assert_eq!(
        h.gateways
            .books
            .count(&BookCriteria::default(), None)
            .await
            .unwrap(),
        4
    );
}

#[tokio::test]
async fn header_only_file_is_a_successful_no_op() {
    let h = Harness::new().await;

    let result = h.engine().ingest(HEADER.as_bytes()).await.unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["totalRows"], 0);
    assert_eq!(json["processedRows"], 0);
    assert_eq!(json["success"], true);
    assert_eq!(json["errors"], serde_json::json!([]));
    assert_eq!(h.scratch_files(), 0);
}

#[tokio::test]
async fn rows_span_multiple_batches() {
    let h = Harness::new().await;
    let total = DEFAULT_BATCH_SIZE * 2 + 7;

    let rows: Vec<String> = (0..total)
        .map(|i| format!("Store {},Addr,Book {},100,Author {},{}.00,", i % 3, i, i % 11, i))
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let result = h.engine().ingest(csv(&refs).as_bytes()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.total_rows, total);
    assert_eq!(result.processed_rows, total);
    assert_eq!(result.created.stores, 3);
    assert_eq!(result.created.authors, 11);
    assert_eq!(result.created.books, total);
    assert_eq!(result.created.store_books, total);
}

#[tokio::test]
async fn small_batches_give_the_same_result() {
    let rows: Vec<String> = (0..23)
        .map(|i| {
            // Every fifth row has a negative price
            let price = if i % 5 == 0 { "-1" } else { "2.50" };
            format!("S,A,Book {},10,Au,{},", i % 7, price)
        })
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let body = csv(&refs);

    let reference = {
        let h = Harness::new().await;
        h.engine().ingest(body.as_bytes()).await.unwrap()
    };

    for batch_size in [1, 4, 23, 50] {
        let h = Harness::new().await;
        let result = h
            .engine()
            .with_batch_size(batch_size)
            .ingest(body.as_bytes())
            .await
            .unwrap();
        assert_eq!(result, reference, "batch size {}", batch_size);
    }

    assert_eq!(reference.errors.len(), 5);
    let rows: Vec<usize> = reference.errors.iter().map(|e| e.row).collect();
    assert_eq!(rows, vec![2, 7, 12, 17, 22]);
}

#[tokio::test]
async fn same_malformed_row_yields_same_message() {
    let h = Harness::new().await;
    let engine = h.engine();
    let body = csv(&[",A,Dune,zero,Au,free,", ",A,Dune,zero,Au,free,"]);

    let result = engine.ingest(body.as_bytes()).await.unwrap();
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].message, result.errors[1].message);
    assert_eq!(result.processed_rows, 0);
}

#[tokio::test]
async fn sold_out_always_matches_copies() {
    let h = Harness::new().await;

    h.engine()
        .ingest(
            csv(&[
                "S,A,One,10,Au,1.00,",
                "S,A,One,10,Au,2.00,",
                "S,A,Two,10,Au,3.00,",
                "T,B,One,10,Au,4.00,",
            ])
            .as_bytes(),
        )
        .await
        .unwrap();

    let stock = h
        .gateways
        .store_books
        .find_all(&StoreBookCriteria::default(), None)
        .await
        .unwrap();
    assert_eq!(stock.len(), 3);

    // Drain one record to zero through the gateway
    h.gateways
        .store_books
        .update(
            &stock[0].id,
            StoreBookPatch {
                copies: Some(0),
                ..StoreBookPatch::default()
            },
            None,
        )
        .await
        .unwrap();

    for row in h
        .gateways
        .store_books
        .find_all(&StoreBookCriteria::default(), None)
        .await
        .unwrap()
    {
        assert_eq!(row.sold_out, row.copies <= 0, "stock row {}", row.id);
    }
}

#[tokio::test]
async fn author_names_merge_across_stores() {
    let h = Harness::new().await;

    let result = h
        .engine()
        .ingest(
            csv(&[
                "North,1 A St,Dune,412,Frank Herbert,9.99,",
                "South,2 B St,Dune,412,Frank Herbert,10.99,",
            ])
            .as_bytes(),
        )
        .await
        .unwrap();

    assert_eq!(result.created.stores, 2);
    assert_eq!(result.created.authors, 1);
    assert_eq!(result.created.books, 1);
    assert_eq!(result.created.store_books, 2);

    assert_eq!(
        h.gateways
            .authors
            .count(&AuthorCriteria::default(), None)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        h.gateways
            .stores
            .count(&StoreCriteria::default(), None)
            .await
            .unwrap(),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_uploads_share_keys_without_duplicates() {
    let h = Harness::new().await;

    // 3 stores, 7 authors, 140 books, 150 stock rows
    let rows: Vec<String> = (0..150)
        .map(|i| format!("Store {},Addr,Book {},100,Author {},5.00,", i % 3, i % 140, i % 7))
        .collect();
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let body = csv(&refs);

    let uploads: Vec<_> = (0..4)
        .map(|_| {
            let engine = h.engine();
            let body = body.clone();
            tokio::spawn(async move { engine.ingest(body.as_bytes()).await })
        })
        .collect();

    let mut processed = 0;
    for upload in uploads {
        let result = upload.await.unwrap().unwrap();
        assert_eq!(result.processed_rows + result.errors.len(), 150);
        processed += result.processed_rows;
    }

    let stores = h
        .gateways
        .stores
        .count(&StoreCriteria::default(), None)
        .await
        .unwrap();
    let authors = h
        .gateways
        .authors
        .count(&AuthorCriteria::default(), None)
        .await
        .unwrap();
    let books = h
        .gateways
        .books
        .count(&BookCriteria::default(), None)
        .await
        .unwrap();
    assert_eq!(stores, 3);
    assert_eq!(authors, 7);
    assert_eq!(books, 140);

    let stock = h
        .gateways
        .store_books
        .find_all(&StoreBookCriteria::default(), None)
        .await
        .unwrap();
    assert_eq!(stock.len(), 150);
    let copies: i64 = stock.iter().map(|row| row.copies).sum();
    assert_eq!(copies as usize, processed);
    assert_eq!(h.scratch_files(), 0);
}
