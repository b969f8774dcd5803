//! Resolve one validated row into entity upserts
//!
//! All writes go through the caller's connection; commit and rollback are
//! the caller's responsibility.

use super::reader::ValidRow;
use crate::error::{Error, Result};
use crate::gateway::{
    BookDefaults, BookKey, Gateway, Gateways, StoreBookDefaults, StoreBookKey, StoreBookPatch,
    StoreDefaults, StorePatch,
};
use sqlx::SqliteConnection;
use tracing::debug;

/// What a single row changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowOutcome {
    pub store_created: bool,
    pub author_created: bool,
    pub book_created: bool,
    pub store_book_created: bool,
    pub store_book_updated: bool,
}

/// Apply one row: store, author, book, then the stock record.
///
/// A repeat sighting of a (store, book) pair adds one copy and takes the
/// row's price. A repeat store sighting with a logo replaces the logo.
pub async fn process_row(
    gateways: &Gateways,
    conn: &mut SqliteConnection,
    row: &ValidRow,
) -> Result<RowOutcome> {
    let mut outcome = RowOutcome::default();

    let (store, created) = gateways
        .stores
        .find_or_create(
            &row.store_name,
            StoreDefaults {
                address: row.store_address.clone(),
                logo: row.logo.clone(),
            },
            Some(&mut *conn),
        )
        .await?;
    outcome.store_created = created;

    if !created && row.logo.is_some() && store.logo != row.logo {
        debug!(store = %store.name, "Replacing store logo");
        gateways
            .stores
            .update(
                &store.id,
                StorePatch {
                    logo: Some(row.logo.clone()),
                    ..StorePatch::default()
                },
                Some(&mut *conn),
            )
            .await?;
    }

    let (author, created) = gateways
        .authors
        .find_or_create(&row.author_name, (), Some(&mut *conn))
        .await?;
    outcome.author_created = created;

    let (book, created) = gateways
        .books
        .find_or_create(
            &BookKey {
                name: row.book_name.clone(),
                author_id: author.id.clone(),
            },
            BookDefaults { pages: row.pages },
            Some(&mut *conn),
        )
        .await?;
    outcome.book_created = created;

    let (stock, created) = gateways
        .store_books
        .find_or_create(
            &StoreBookKey {
                store_id: store.id.clone(),
                book_id: book.id.clone(),
            },
            StoreBookDefaults {
                price: row.price,
                copies: 1,
            },
            Some(&mut *conn),
        )
        .await?;

    if created {
        outcome.store_book_created = true;
    } else {
        let copies = stock.copies + 1;
        gateways
            .store_books
            .update(
                &stock.id,
                StoreBookPatch {
                    price: Some(row.price),
                    copies: Some(copies),
                },
                Some(&mut *conn),
            )
            .await?
            .ok_or_else(|| Error::Other(format!("Stock record {} vanished during update", stock.id)))?;
        debug!(store = %store.name, book = %book.name, copies, "Restocked book");
        outcome.store_book_updated = true;
    }

    Ok(outcome)
}
