//! Book gateway

use super::{new_id, now, Gateway, Tx};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Book {
    pub id: String,
    pub name: String,
    pub pages: i64,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub name: String,
    pub pages: i64,
    pub author_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct BookCriteria {
    pub name: Option<String>,
    pub author_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BookPatch {
    pub name: Option<String>,
    pub pages: Option<i64>,
    pub author_id: Option<String>,
}

/// Ingestion identity of a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookKey {
    pub name: String,
    pub author_id: String,
}

#[derive(Debug, Clone)]
pub struct BookDefaults {
    pub pages: i64,
}

#[derive(Clone)]
pub struct BookGateway {
    pool: SqlitePool,
}

impl BookGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_criteria(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &BookCriteria) {
    if let Some(name) = &criteria.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(author_id) = &criteria.author_id {
        qb.push(" AND author_id = ").push_bind(author_id.clone());
    }
}

async fn select_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Book>> {
    let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(book)
}

#[async_trait]
impl Gateway for BookGateway {
    type Entity = Book;
    type Criteria = BookCriteria;
    type New = NewBook;
    type Patch = BookPatch;
    type Key = BookKey;
    type Defaults = BookDefaults;

    async fn find_by_id(&self, id: &str, tx: Tx<'_>) -> Result<Option<Book>> {
        on_conn!(self.pool, tx, |conn| select_by_id(conn, id).await)
    }

    async fn find_one(&self, criteria: &BookCriteria, tx: Tx<'_>) -> Result<Option<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" LIMIT 1");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Book>()
            .fetch_optional(&mut *conn)
            .await?))
    }

    async fn find_all(&self, criteria: &BookCriteria, tx: Tx<'_>) -> Result<Vec<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" ORDER BY name");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Book>()
            .fetch_all(&mut *conn)
            .await?))
    }

    async fn count(&self, criteria: &BookCriteria, tx: Tx<'_>) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM books WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?))
    }

    async fn create(&self, data: NewBook, tx: Tx<'_>) -> Result<Book> {
        let ts = now();
        let book = Book {
            id: new_id(),
            name: data.name,
            pages: data.pages,
            author_id: data.author_id,
            created_at: ts.clone(),
            updated_at: ts,
        };
        on_conn!(self.pool, tx, |conn| {
            sqlx::query(
                r#"
                INSERT INTO books (id, name, pages, author_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&book.id)
            .bind(&book.name)
            .bind(book.pages)
            .bind(&book.author_id)
            .bind(&book.created_at)
            .bind(&book.updated_at)
            .execute(&mut *conn)
            .await?;
            Ok(book)
        })
    }

    async fn find_or_create(
        &self,
        key: &BookKey,
        defaults: BookDefaults,
        tx: Tx<'_>,
    ) -> Result<(Book, bool)> {
        let ts = now();
        on_conn!(self.pool, tx, |conn| {
            // Pages only apply on insert; an existing book keeps its own
            let inserted = sqlx::query(
                r#"
                INSERT INTO books (id, name, pages, author_id, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(name, author_id) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(&key.name)
            .bind(defaults.pages)
            .bind(&key.author_id)
            .bind(&ts)
            .bind(&ts)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            let book =
                sqlx::query_as::<_, Book>("SELECT * FROM books WHERE name = ? AND author_id = ?")
                    .bind(&key.name)
                    .bind(&key.author_id)
                    .fetch_one(&mut *conn)
                    .await?;
            Ok((book, inserted == 1))
        })
    }

    async fn update(&self, id: &str, patch: BookPatch, tx: Tx<'_>) -> Result<Option<Book>> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE books SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = patch.name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(pages) = patch.pages {
                set.push("pages = ").push_bind_unseparated(pages);
            }
            if let Some(author_id) = patch.author_id {
                set.push("author_id = ").push_bind_unseparated(author_id);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Db;
    use crate::gateway::AuthorGateway;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_book_key_includes_author() {
        let tmp = TempDir::new().unwrap();
        let db = Db::open(&tmp.path().join("test.db")).await.unwrap();
        let authors = AuthorGateway::new(db.pool().clone());
        let books = BookGateway::new(db.pool().clone());

        let (herbert, _) = authors
            .find_or_create(&"Frank Herbert".to_string(), (), None)
            .await
            .unwrap();
        let (other, _) = authors
            .find_or_create(&"Brian Herbert".to_string(), (), None)
            .await
            .unwrap();

        let key = BookKey {
            name: "Dune".to_string(),
            author_id: herbert.id.clone(),
        };
        let (dune, created) = books
            .find_or_create(&key, BookDefaults { pages: 412 }, None)
            .await
            .unwrap();
        assert!(created);

        // Same key: existing pages are kept
        let (again, created) = books
            .find_or_create(&key, BookDefaults { pages: 999 }, None)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, dune.id);
        assert_eq!(again.pages, 412);

        // Same title under another author is a different book
        let (_, created) = books
            .find_or_create(
                &BookKey {
                    name: "Dune".to_string(),
                    author_id: other.id.clone(),
                },
                BookDefaults { pages: 300 },
                None,
            )
            .await
            .unwrap();
        assert!(created);

        let by_title = BookCriteria {
            name: Some("Dune".to_string()),
            ..BookCriteria::default()
        };
        assert_eq!(books.count(&by_title, None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_book_requires_existing_author() {
        let tmp = TempDir::new().unwrap();
        let db = Db::open(&tmp.path().join("test.db")).await.unwrap();
        let books = BookGateway::new(db.pool().clone());

        let result = books
            .create(
                NewBook {
                    name: "Orphan".to_string(),
                    pages: 10,
                    author_id: "no-such-author".to_string(),
                },
                None,
            )
            .await;
        assert!(result.is_err());
    }
}
