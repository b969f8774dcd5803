//! Store gateway

use super::{new_id, now, Gateway, Tx};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

/// A physical store
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Store {
    pub id: String,
    pub name: String,
    pub address: String,
    pub logo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub address: String,
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreCriteria {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl StoreCriteria {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StorePatch {
    pub name: Option<String>,
    pub address: Option<String>,
    /// `Some(None)` clears the logo
    pub logo: Option<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct StoreDefaults {
    pub address: String,
    pub logo: Option<String>,
}

#[derive(Clone)]
pub struct StoreGateway {
    pool: SqlitePool,
}

impl StoreGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_criteria(qb: &mut QueryBuilder<'_, Sqlite>, criteria: &StoreCriteria) {
    if let Some(name) = &criteria.name {
        qb.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(address) = &criteria.address {
        qb.push(" AND address = ").push_bind(address.clone());
    }
}

async fn select_by_id(conn: &mut SqliteConnection, id: &str) -> Result<Option<Store>> {
    let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(store)
}

async fn select_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Store>> {
    let store = sqlx::query_as::<_, Store>("SELECT * FROM stores WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(store)
}

#[async_trait]
impl Gateway for StoreGateway {
    type Entity = Store;
    type Criteria = StoreCriteria;
    type New = NewStore;
    type Patch = StorePatch;
    type Key = String;
    type Defaults = StoreDefaults;

    async fn find_by_id(&self, id: &str, tx: Tx<'_>) -> Result<Option<Store>> {
        on_conn!(self.pool, tx, |conn| select_by_id(conn, id).await)
    }

    async fn find_one(&self, criteria: &StoreCriteria, tx: Tx<'_>) -> Result<Option<Store>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM stores WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" LIMIT 1");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Store>()
            .fetch_optional(&mut *conn)
            .await?))
    }

    async fn find_all(&self, criteria: &StoreCriteria, tx: Tx<'_>) -> Result<Vec<Store>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM stores WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        qb.push(" ORDER BY name");
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_as::<Store>()
            .fetch_all(&mut *conn)
            .await?))
    }

    async fn count(&self, criteria: &StoreCriteria, tx: Tx<'_>) -> Result<i64> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM stores WHERE 1 = 1");
        push_criteria(&mut qb, criteria);
        on_conn!(self.pool, tx, |conn| Ok(qb
            .build_query_scalar::<i64>()
            .fetch_one(&mut *conn)
            .await?))
    }

    async fn create(&self, data: NewStore, tx: Tx<'_>) -> Result<Store> {
        let ts = now();
        let store = Store {
            id: new_id(),
            name: data.name,
            address: data.address,
            logo: data.logo,
            created_at: ts.clone(),
            updated_at: ts,
        };
        on_conn!(self.pool, tx, |conn| {
            sqlx::query(
                r#"
                INSERT INTO stores (id, name, address, logo, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&store.id)
            .bind(&store.name)
            .bind(&store.address)
            .bind(&store.logo)
            .bind(&store.created_at)
            .bind(&store.updated_at)
            .execute(&mut *conn)
            .await?;
            Ok(store)
        })
    }

    async fn find_or_create(
        &self,
        name: &String,
        defaults: StoreDefaults,
        tx: Tx<'_>,
    ) -> Result<(Store, bool)> {
        let ts = now();
        on_conn!(self.pool, tx, |conn| {
            let inserted = sqlx::query(
                r#"
                INSERT INTO stores (id, name, address, logo, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(name) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(name)
            .bind(&defaults.address)
            .bind(&defaults.logo)
            .bind(&ts)
            .bind(&ts)
            .execute(&mut *conn)
            .await?
            .rows_affected();

            let store = select_by_name(&mut *conn, name)
                .await?
                .ok_or_else(|| sqlx::Error::RowNotFound)?;
            Ok((store, inserted == 1))
        })
    }

    async fn update(&self, id: &str, patch: StorePatch, tx: Tx<'_>) -> Result<Option<Store>> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE stores SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(name) = patch.name {
                set.push("name = ").push_bind_unseparated(name);
            }
            if let Some(address) = patch.address {
                set.push("address = ").push_bind_unseparated(address);
            }
            if let Some(logo) = patch.logo {
                set.push("logo = ").push_bind_unseparated(logo);
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
