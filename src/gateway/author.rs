//! Author gateway

use super::{new_id, now, Gateway, Tx};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorCriteria {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AuthorPatch {
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct AuthorGateway {
    pool: SqlitePool,
}

impl AuthorGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_criteria(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &AuthorCriteria) {
    if let Some(name) = &criteria.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
}

async fn select_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Author>> {
    let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(author)
}

#[async_trait]
impl Gateway for AuthorGateway {
    type Entity = Author;
    type Criteria = AuthorCriteria;
    type New = NewAuthor;
    type Patch = AuthorPatch;
    type Key = String;
    type Defaults = ();

    async fn find_by_id(&self, id: &str, tx: Tx<'_>) -> Result<Option<Author>> {
        on_conn!(self.pool, tx, |conn| select_by_id(conn, id).await)
    }

    async fn find_one(&self, criteria: &AuthorCriteria, tx: Tx<'_>) -> Result<Option<Author>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM authors WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" LIMIT 1");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Author>()
            .fetch_optional(&mut *conn)
            .await?))
    }

    async fn find_all(&self, criteria: &AuthorCriteria, tx: Tx<'_>) -> Result<Vec<Author>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM authors WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" ORDER BY name");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Author>()
            .fetch_all(&mut *conn)
            .await?))
    }

    async fn count(&self, criteria: &AuthorCriteria, tx: Tx<'_>) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM authors WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?))
    }

    async fn create(&self, data: NewAuthor, tx: Tx<'_>) -> Result<Author> {
        let ts = now();
        let author = Author {
            id: new_id(),
            name: data.name,
            created_at: ts.clone(),
            updated_at: ts,
        };
        on_conn!(self.pool, tx, |conn| {
            sqlx::query("INSERT INTO authors (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)")
                .bind(&author.id)
                .bind(&author.name)
                .bind(&author.created_at)
                .bind(&author.updated_at)
                .execute(&mut *conn)
                .await?;
            Ok(author)
        })
    }

    async fn find_or_create(
        &self,
        name: &String,
        _defaults: (),
        tx: Tx<'_>,
    ) -> Result<(Author, bool)> {
        let ts = now();
        on_conn!(self.pool, tx, |conn| {
            let inserted = sqlx::query(
                r#"
                INSERT INTO authors (id, name, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(name) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(name)
            .bind(&ts)
            .bind(&ts)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            let author = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE name = ?")
                .bind(name)
                .fetch_one(&mut *conn)
                .await?;
            Ok((author, inserted == 1))
        })
    }

    async fn update(&self, id: &str, patch: AuthorPatch, tx: Tx<'_>) -> Result<Option<Author>> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE authors SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = patch.name {
                set.push("name = ").push_bind_unseparated(name);
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
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_author_find_or_create() {
        let tmp = TempDir::new().unwrap();
        let db = Db::open(&tmp.path().join("test.db")).await.unwrap();
        let authors = AuthorGateway::new(db.pool().clone());

        let name = "Ursula K. Le Guin".to_string();
        let (first, created) = authors.find_or_create(&name, (), None).await.unwrap();
        assert!(created);
        let (second, created) = authors.find_or_create(&name, (), None).await.unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        let renamed = authors
            .update(
                &first.id,
                AuthorPatch {
                    name: Some("U. K. Le Guin".to_string()),
                },
                None,
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "U. K. Le Guin");

        let matches = authors
            .find_all(
                &AuthorCriteria {
                    name: Some(name.clone()),
                },
                None,
            )
            .await
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(authors.count(&AuthorCriteria::default(), None).await.unwrap(), 1);
    }
}
