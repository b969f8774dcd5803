//! Store book (stock record) gateway
//!
//! `sold_out` is never written directly: it is derived from `copies` on
//! every insert and on every update that touches `copies`.

use super::{new_id, now, Gateway, Tx};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// Stock of one book in one store
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StoreBook {
    pub id: String,
    pub store_id: String,
    pub book_id: String,
    pub price: f64,
    pub copies: i64,
    pub sold_out: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewStoreBook {
    pub store_id: String,
    pub book_id: String,
    pub price: f64,
    pub copies: i64,
}

#[derive(Debug, Clone, Default)]
pub struct StoreBookCriteria {
    pub store_id: Option<String>,
    pub book_id: Option<String>,
    pub sold_out: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreBookPatch {
    pub price: Option<f64>,
    pub copies: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreBookKey {
    pub store_id: String,
    pub book_id: String,
}

#[derive(Debug, Clone)]
pub struct StoreBookDefaults {
    pub price: f64,
    pub copies: i64,
}

fn sold_out(copies: i64) -> bool {
    copies <= 0
}

#[derive(Clone)]
pub struct StoreBookGateway {
    pool: SqlitePool,
}

impl StoreBookGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_criteria(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &StoreBookCriteria) {
    if let Some(store_id) = &criteria.store_id {
        qb.push(" AND store_id = ").push_bind(store_id.clone());
    }
    if let Some(book_id) = &criteria.book_id {
        qb.push(" AND book_id = ").push_bind(book_id.clone());
    }
    if let Some(flag) = criteria.sold_out {
        qb.push(" AND sold_out = ").push_bind(flag);
    }
}

async fn select_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<StoreBook>> {
    let row = sqlx::query_as::<_, StoreBook>("SELECT * FROM store_books WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn insert(
    conn: &mut SqliteConnection,
    row: &StoreBook,
    ignore_conflict: bool,
) -> Result<u64> {
    let sql = if ignore_conflict {
        r#"
        INSERT INTO store_books (id, store_id, book_id, price, copies, sold_out, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(store_id, book_id) DO NOTHING
        "#
    } else {
        r#"
        INSERT INTO store_books (id, store_id, book_id, price, copies, sold_out, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#
    };
    let affected = sqlx::query(sql)
        .bind(&row.id)
        .bind(&row.store_id)
        .bind(&row.book_id)
        .bind(row.price)
        .bind(row.copies)
        .bind(row.sold_out)
        .bind(&row.created_at)
        .bind(&row.updated_at)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    Ok(affected)
}

fn build(store_id: String, book_id: String, price: f64, copies: i64) -> StoreBook {
    let ts = now();
    StoreBook {
        id: new_id(),
        store_id,
        book_id,
        price,
        copies,
        sold_out: sold_out(copies),
        created_at: ts.clone(),
        updated_at: ts,
    }
}

#[async_trait]
impl Gateway for StoreBookGateway {
    type Entity = StoreBook;
    type Criteria = StoreBookCriteria;
    type New = NewStoreBook;
    type Patch = StoreBookPatch;
    type Key = StoreBookKey;
    type Defaults = StoreBookDefaults;

    async fn find_by_id(&self, id: &str, tx: Tx<'_>) -> Result<Option<StoreBook>> {
        on_conn!(self.pool, tx, |conn| select_by_id(conn, id).await)
    }

    async fn find_one(
        &self,
        criteria: &StoreBookCriteria,
        tx: Tx<'_>,
    ) -> Result<Option<StoreBook>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM store_books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" LIMIT 1");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<StoreBook>()
            .fetch_optional(&mut *conn)
            .await?))
    }

    async fn find_all(&self, criteria: &StoreBookCriteria, tx: Tx<'_>) -> Result<Vec<StoreBook>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM store_books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" ORDER BY rowid");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<StoreBook>()
            .fetch_all(&mut *conn)
            .await?))
    }

    async fn count(&self, criteria: &StoreBookCriteria, tx: Tx<'_>) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM store_books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?))
    }

    async fn create(&self, data: NewStoreBook, tx: Tx<'_>) -> Result<StoreBook> {
        let row = build(data.store_id, data.book_id, data.price, data.copies);
        on_conn!(self.pool, tx, |conn| {
            insert(conn, &row, false).await?;
            Ok(row)
        })
    }

    async fn find_or_create(
        &self,
        key: &StoreBookKey,
        defaults: StoreBookDefaults,
        tx: Tx<'_>,
    ) -> Result<(StoreBook, bool)> {
        let row = build(
            key.store_id.clone(),
            key.book_id.clone(),
            defaults.price,
            defaults.copies,
        );
        on_conn!(self.pool, tx, |conn| {
            let inserted = insert(&mut *conn, &row, true).await?;
            let existing = sqlx::query_as::<_, StoreBook>(
                "SELECT * FROM store_books WHERE store_id = ? AND book_id = ?",
            )
            .bind(&key.store_id)
            .bind(&key.book_id)
            .fetch_one(&mut *conn)
            .await?;
            Ok((existing, inserted == 1))
        })
    }

    async fn update(
        &self,
        id: &str,
        patch: StoreBookPatch,
        tx: Tx<'_>,
    ) -> Result<Option<StoreBook>> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE store_books SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(price) = patch.price {
                set.push("price = ").push_bind_unseparated(price);
            }
            if let Some(copies) = patch.copies {
                set.push("copies = ").push_bind_unseparated(copies);
                set.push("sold_out = ").push_bind_unseparated(sold_out(copies));
            }
            set.push("updated_at = ").push_bind_unseparated(now());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        on_conn!(self.pool, tx, |conn| {
            let affected = qb.build().execute(&mut *conn).await?.rows_affected();
            if affected == 0 {
                return Ok(None);
            }
            select_by_id(&mut *conn, id).await
        })
    }
}
