//! Entity gateways
//!
//! Each gateway owns writes to exactly one table. Every operation takes an
//! optional connection: when the caller passes its open transaction the
//! operation runs inside it, and commit or rollback stays with the caller.
//! Without one, the gateway borrows a pooled connection for the single call.

/// Run `$body` on the caller's connection, or on a pooled one when `$tx` is `None`.
macro_rules! on_conn {
    ($pool:expr, $tx:expr, |$conn:ident| $body:expr) => {
        match $tx {
            Some($conn) => $body,
            None => {
                let mut pooled = $pool.acquire().await?;
                let $conn: &mut sqlx::SqliteConnection = &mut pooled;
                $body
            }
        }
    };
}

mod author;
mod book;
mod store;
mod store_book;

pub use author::*;
pub use book::*;
pub use store::*;
pub use store_book::*;

use crate::db::Db;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::SqliteConnection;

/// Optional transaction handle threaded through gateway calls
pub type Tx<'a> = Option<&'a mut SqliteConnection>;

/// Data-access capability shared by all entity gateways
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Persisted row type
    type Entity: Send;
    /// Equality filters for `find_one`, `find_all` and `count`
    type Criteria: Send + Sync;
    /// Full data for `create`
    type New: Send;
    /// Partial update for `update`
    type Patch: Send;
    /// Unique key used by `find_or_create`
    type Key: Send + Sync;
    /// Non-key fields used when `find_or_create` inserts
    type Defaults: Send;

    async fn find_by_id(&self, id: &str, tx: Tx<'_>) -> Result<Option<Self::Entity>>;

    async fn find_one(&self, criteria: &Self::Criteria, tx: Tx<'_>) -> Result<Option<Self::Entity>>;

    async fn find_all(&self, criteria: &Self::Criteria, tx: Tx<'_>) -> Result<Vec<Self::Entity>>;

    async fn count(&self, criteria: &Self::Criteria, tx: Tx<'_>) -> Result<i64>;

    async fn create(&self, data: Self::New, tx: Tx<'_>) -> Result<Self::Entity>;

    /// Look up by `key`, inserting with `defaults` when absent.
    ///
    /// Returns the entity and whether this call created it. The insert uses
    /// `ON CONFLICT DO NOTHING` on the unique key, so concurrent callers
    /// converge on a single row.
    async fn find_or_create(
        &self,
        key: &Self::Key,
        defaults: Self::Defaults,
        tx: Tx<'_>,
    ) -> Result<(Self::Entity, bool)>;

    /// Apply `patch` to the row with `id`; `None` when no such row exists
    async fn update(&self, id: &str, patch: Self::Patch, tx: Tx<'_>) -> Result<Option<Self::Entity>>;
}

/// All entity gateways over one pool
#[derive(Clone)]
pub struct Gateways {
    pub stores: StoreGateway,
    pub authors: AuthorGateway,
    pub books: BookGateway,
    pub store_books: StoreBookGateway,
}

impl Gateways {
    pub fn new(db: &Db) -> Self {
        let pool = db.pool().clone();
        Self {
            stores: StoreGateway::new(pool.clone()),
            authors: AuthorGateway::new(pool.clone()),
            books: BookGateway::new(pool.clone()),
            store_books: StoreBookGateway::new(pool),
        }
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
