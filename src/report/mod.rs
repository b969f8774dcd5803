//! Per-store inventory reports
//!
//! [`ReportAssembler`] runs the read-only aggregation queries; a
//! [`ReportRenderer`] turns the assembled [`ReportData`] into a document.

mod logo;
mod pdf;

pub use logo::*;
pub use pdf::*;

use crate::db::Db;
use crate::error::Result;
use crate::gateway::{Gateway, Store, StoreGateway};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// One of a store's most expensive stock rows
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PricedBook {
    pub book_name: String,
    pub author_name: String,
    pub price: f64,
    pub pages: i64,
}

/// An author ranked by how many distinct titles a store has in stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorStock {
    pub author_id: String,
    pub author_name: String,
    pub books_in_stock: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub store: Store,
    pub priciest_books: Vec<PricedBook>,
    pub prolific_authors: Vec<AuthorStock>,
}

#[derive(Debug, FromRow)]
struct InStockRow {
    book_id: String,
    author_id: String,
    author_name: String,
}

/// Builds [`ReportData`] for a store
#[derive(Clone)]
pub struct ReportAssembler {
    pool: SqlitePool,
    stores: StoreGateway,
    top_n: usize,
}

impl ReportAssembler {
    pub fn new(db: &Db, top_n: usize) -> Self {
        Self {
            pool: db.pool().clone(),
            stores: StoreGateway::new(db.pool().clone()),
            top_n,
        }
    }

    /// Assemble the report for `store_id`; `None` when the store does not exist
    pub async fn get_store_report_data(&self, store_id: &str) -> Result<Option<ReportData>> {
        let Some(store) = self.stores.find_by_id(store_id, None).await? else {
            debug!(store_id, "No store for report");
            return Ok(None);
        };

        let (priciest_books, prolific_authors) =
            futures::try_join!(self.priciest_books(store_id), self.prolific_authors(store_id))?;

        Ok(Some(ReportData {
            store,
            priciest_books,
            prolific_authors,
        }))
    }

    async fn priciest_books(&self, store_id: &str) -> Result<Vec<PricedBook>> {
        let rows = sqlx::query_as::<_, PricedBook>(
            r#"
            SELECT b.name AS book_name, a.name AS author_name, sb.price AS price, b.pages AS pages
            FROM store_books sb
            JOIN books b ON b.id = sb.book_id
            JOIN authors a ON a.id = b.author_id
            WHERE sb.store_id = ?
            ORDER BY sb.price DESC
            LIMIT ?
            "#,
        )
        .bind(store_id)
        .bind(self.top_n as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn prolific_authors(&self, store_id: &str) -> Result<Vec<AuthorStock>> {
        let rows = sqlx::query_as::<_, InStockRow>(
            r#"
            SELECT b.id AS book_id, a.id AS author_id, a.name AS author_name
            FROM store_books sb
            JOIN books b ON b.id = sb.book_id
            JOIN authors a ON a.id = b.author_id
            WHERE sb.store_id = ? AND sb.copies > 0
            ORDER BY sb.rowid
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rank_authors(rows, self.top_n))
    }
}

/// Count distinct books per author, keeping first-seen order for ties
fn rank_authors(rows: Vec<InStockRow>, top_n: usize) -> Vec<AuthorStock> {
    let mut order: Vec<(AuthorStock, HashSet<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let slot = *index.entry(row.author_id.clone()).or_insert_with(|| {
            order.push((
                AuthorStock {
                    author_id: row.author_id.clone(),
                    author_name: row.author_name.clone(),
                    books_in_stock: 0,
                },
                HashSet::new(),
            ));
            order.len() - 1
        });
        order[slot].1.insert(row.book_id);
    }

    let mut ranked: Vec<AuthorStock> = order
        .into_iter()
        .map(|(mut author, books)| {
            author.books_in_stock = books.len();
            author
        })
        .collect();
    // Stable sort
    ranked.sort_by(|a, b| b.books_in_stock.cmp(&a.books_in_stock));
    ranked.truncate(top_n);
    ranked
}

/// Download name for a store's report, e.g. `Corner-Books-2024-05-01.pdf`
pub fn report_filename(store_name: &str, date: NaiveDate) -> String {
    static NON_ALNUM: OnceLock<Option<Regex>> = OnceLock::new();
    let slug = match NON_ALNUM.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").ok()) {
        Some(re) => re.replace_all(store_name, "-").into_owned(),
        None => store_name.to_string(),
    };
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "store" } else { slug };
    format!("{}-{}.pdf", slug, date.format("%Y-%m-%d"))
}
