//! Shared test utilities for the storefront.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        cart,
        catalog::{self, NewCatalogEntry},
        coupon::{self, NewCoupon},
    },
    entities,
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, DatabaseConnection, Set};
use std::path::{Path, PathBuf};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database under the system temp directory.
///
/// The pool holds several connections to the same file, so concurrent
/// operations really run on separate connections. Any file left by a
/// previous run is removed first; call [`remove_test_db`] when done.
pub async fn setup_file_test_db(name: &str) -> Result<(DatabaseConnection, PathBuf)> {
    let path = std::env::temp_dir().join(format!(
        "storefront-{name}-{}.sqlite",
        std::process::id()
    ));
    remove_test_db(&path);
    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(4);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Best-effort cleanup for [`setup_file_test_db`].
pub fn remove_test_db(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Shorthand for a calendar date; panics on an invalid date.
#[allow(clippy::expect_used)]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Creates a catalog entry with a whole-unit base price and no promotion.
pub async fn create_test_entry(
    db: &DatabaseConnection,
    name: &str,
    base_price: i64,
) -> Result<entities::catalog_entry::Model> {
    catalog::create_entry(db, NewCatalogEntry::new(name, Decimal::from(base_price))).await
}

/// Creates a catalog entry with a promotion window.
pub async fn create_promo_entry(
    db: &DatabaseConnection,
    name: &str,
    base_price: i64,
    promo_price: i64,
    promo_start: NaiveDate,
    promo_end: NaiveDate,
) -> Result<entities::catalog_entry::Model> {
    catalog::create_entry(
        db,
        NewCatalogEntry::new(name, Decimal::from(base_price)).with_promotion(
            Decimal::from(promo_price),
            promo_start,
            promo_end,
        ),
    )
    .await
}

/// Coupon input with sensible defaults.
///
/// # Defaults
/// * `active`: true
/// * `expires_on`: 2099-01-01
/// * `usage_cap`: 10
pub fn new_test_coupon(code: &str, reduction: Decimal) -> NewCoupon {
    NewCoupon {
        code: code.to_string(),
        label: format!("{code} test coupon"),
        reduction,
        active: true,
        expires_on: date(2099, 1, 1),
        usage_cap: 10,
    }
}

/// Creates an active coupon expiring on 2099-01-01.
pub async fn create_test_coupon(
    db: &DatabaseConnection,
    code: &str,
    reduction: Decimal,
    usage_cap: i32,
) -> Result<entities::coupon::Model> {
    let mut new_coupon = new_test_coupon(code, reduction);
    new_coupon.usage_cap = usage_cap;
    coupon::create_coupon(db, new_coupon).await
}

/// Flags a cart as checked out without going through checkout.
pub async fn mark_checked_out(db: &DatabaseConnection, cart_id: i64) -> Result<()> {
    let cart = entities::cart::ActiveModel {
        id: Set(cart_id),
        is_checked_out: Set(true),
        ..Default::default()
    };
    cart.update(db).await?;
    Ok(())
}

/// Sets up a database with an empty cart and a 100.00 catalog entry.
/// Returns (db, cart, entry).
pub async fn setup_with_cart_and_entry() -> Result<(
    DatabaseConnection,
    entities::cart::Model,
    entities::catalog_entry::Model,
)> {
    let db = setup_test_db().await?;
    let entry = create_test_entry(&db, "Test Entry", 100).await?;
    let cart = cart::create_cart(&db).await?;
    Ok((db, cart, entry))
}
