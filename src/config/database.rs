//! Database configuration module for the storefront.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The one constraint entities cannot
//! express, the composite uniqueness of cart lines, is added here as an explicit index.

use crate::entities::{Cart, CartLine, CatalogEntry, Coupon, cart_line};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/storefront.sqlite?mode=rwc";

/// Name of the unique index guarding one line per (cart, entry) pair.
pub const CART_LINE_UNIQUE_INDEX: &str = "idx_cart_lines_cart_entry";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back
/// to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the parent directory of a file-backed `SQLite` URL so the database file
/// can be created. Other URLs are left alone.
///
/// # Errors
/// Returns an error if the parent directory cannot be created.
pub fn ensure_sqlite_directory(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = std::path::Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Establishes a connection to the database named by [`get_database_url`].
///
/// # Errors
/// Returns an error if the database cannot be reached or the URL is invalid.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all storefront tables and indexes if they do not exist yet.
///
/// Coupons and catalog entries are created first so the foreign keys of carts
/// and cart lines resolve.
///
/// # Errors
/// Returns an error if any table or index creation statement fails.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let coupon_table = schema
        .create_table_from_entity(Coupon)
        .if_not_exists()
        .to_owned();
    let catalog_table = schema
        .create_table_from_entity(CatalogEntry)
        .if_not_exists()
        .to_owned();
    let cart_table = schema
        .create_table_from_entity(Cart)
        .if_not_exists()
        .to_owned();
    let cart_line_table = schema
        .create_table_from_entity(CartLine)
        .if_not_exists()
        .to_owned();

    db.execute(builder.build(&coupon_table)).await?;
    db.execute(builder.build(&catalog_table)).await?;
    db.execute(builder.build(&cart_table)).await?;
    db.execute(builder.build(&cart_line_table)).await?;

    let line_index = Index::create()
        .name(CART_LINE_UNIQUE_INDEX)
        .table(CartLine)
        .col(cart_line::Column::CartId)
        .col(cart_line::Column::CatalogEntryId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&line_index)).await?;

    debug!("Storefront tables ready");
    Ok(())
}
