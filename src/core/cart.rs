//! Cart business logic - Line management and subtotals.
//!
//! A cart holds at most one line per catalog entry. Adding an entry that is already
//! present grows the existing line instead of creating a second one; the increment is
//! a single `INSERT ... ON CONFLICT DO UPDATE` against the unique
//! `(cart_id, catalog_entry_id)` index, so two concurrent adds cannot lose an update.
//!
//! Functions are generic over [`ConnectionTrait`] so callers decide the transaction
//! boundary: pass a `DatabaseConnection` for autocommit or a `DatabaseTransaction`.

use crate::{
    core::pricing,
    entities::{Cart, CartLine, CatalogEntry, cart, cart_line, catalog_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    QueryOrder, Set,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::Serialize;
use tracing::{debug, instrument};

/// A cart line together with its price on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    /// Line identifier
    pub line_id: i64,
    /// Entry being purchased
    pub catalog_entry_id: i64,
    /// Entry name at pricing time
    pub name: String,
    /// Units in the line
    pub quantity: i32,
    /// Effective unit price (promotional when the window is open)
    pub unit_price: Decimal,
    /// `quantity * unit_price`
    pub line_total: Decimal,
}

/// Creates an empty cart.
///
/// # Errors
/// Returns an error if the database insert fails.
#[instrument(skip(db))]
pub async fn create_cart<C>(db: &C) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let cart = cart::ActiveModel {
        coupon_id: Set(None),
        is_checked_out: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    cart.insert(db).await.map_err(Into::into)
}

/// Retrieves a cart by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_cart_by_id<C>(db: &C, cart_id: i64) -> Result<Option<cart::Model>>
where
    C: ConnectionTrait,
{
    Cart::find_by_id(cart_id).one(db).await.map_err(Into::into)
}

/// Loads a cart or fails with [`Error::NotFound`].
pub(crate) async fn require_cart<C>(db: &C, cart_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    get_cart_by_id(db, cart_id)
        .await?
        .ok_or_else(|| Error::not_found("Cart", cart_id))
}

/// Loads a cart that can still be modified.
pub(crate) async fn require_open_cart<C>(db: &C, cart_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let cart = require_cart(db, cart_id).await?;
    if cart.is_checked_out {
        return Err(Error::validation(format!(
            "Cart {cart_id} has already been checked out"
        )));
    }
    Ok(cart)
}

pub(crate) async fn touch_cart<C>(db: &C, cart_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Cart::update_many()
        .col_expr(
            cart::Column::UpdatedAt,
            Expr::value(chrono::Utc::now().naive_utc()),
        )
        .filter(cart::Column::Id.eq(cart_id))
        .exec(db)
        .await?;
    Ok(())
}

async fn find_line<C>(db: &C, cart_id: i64, entry_id: i64) -> Result<Option<cart_line::Model>>
where
    C: ConnectionTrait,
{
    CartLine::find()
        .filter(cart_line::Column::CartId.eq(cart_id))
        .filter(cart_line::Column::CatalogEntryId.eq(entry_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns the lines of a cart in insertion order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_lines<C>(db: &C, cart_id: i64) -> Result<Vec<cart_line::Model>>
where
    C: ConnectionTrait,
{
    CartLine::find()
        .filter(cart_line::Column::CartId.eq(cart_id))
        .order_by_asc(cart_line::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns the lines of a cart joined with their catalog entries.
///
/// # Errors
/// Returns [`Error::NotFound`] if a line references an entry that no longer exists.
pub async fn get_lines_with_entries<C>(
    db: &C,
    cart_id: i64,
) -> Result<Vec<(cart_line::Model, catalog_entry::Model)>>
where
    C: ConnectionTrait,
{
    CartLine::find()
        .filter(cart_line::Column::CartId.eq(cart_id))
        .order_by_asc(cart_line::Column::Id)
        .find_also_related(CatalogEntry)
        .all(db)
        .await?
        .into_iter()
        .map(|(line, entry)| match entry {
            Some(entry) => Ok((line, entry)),
            None => Err(Error::not_found("Catalog entry", line.catalog_entry_id)),
        })
        .collect()
}

/// Adds `quantity` units of an entry to a cart, merging with an existing line.
///
/// Calling this twice with quantity 3 leaves one line with quantity 6.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is zero or negative
/// - The merged quantity would exceed `i32::MAX`
/// - The cart or entry does not exist
/// - The cart has already been checked out
/// - The database write fails
#[instrument(skip(db))]
pub async fn add_to_cart<C>(
    db: &C,
    cart_id: i64,
    entry_id: i64,
    quantity: i32,
) -> Result<cart_line::Model>
where
    C: ConnectionTrait,
{
    if quantity <= 0 {
        return Err(Error::validation(format!(
            "Quantity must be a positive integer (got {quantity})"
        )));
    }

    require_open_cart(db, cart_id).await?;
    CatalogEntry::find_by_id(entry_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Catalog entry", entry_id))?;

    let line = cart_line::ActiveModel {
        cart_id: Set(cart_id),
        catalog_entry_id: Set(entry_id),
        quantity: Set(quantity),
        ..Default::default()
    };

    // quantity = quantity + n when the (cart, entry) line already exists;
    // the WHERE guard skips the update instead of overflowing the i32 column
    let rows = CartLine::insert(line)
        .on_conflict(
            OnConflict::columns([
                cart_line::Column::CartId,
                cart_line::Column::CatalogEntryId,
            ])
            .value(
                cart_line::Column::Quantity,
                Expr::col(cart_line::Column::Quantity).add(quantity),
            )
            .action_and_where(Expr::col(cart_line::Column::Quantity).lte(i32::MAX - quantity))
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if rows == 0 {
        return Err(Error::validation(format!(
            "Adding {quantity} would exceed the maximum quantity of {} for entry {entry_id}",
            i32::MAX
        )));
    }

    touch_cart(db, cart_id).await?;

    let line = find_line(db, cart_id, entry_id)
        .await?
        .ok_or_else(|| Error::not_found("Cart line", format!("{cart_id}/{entry_id}")))?;
    debug!("Cart {} now holds {} of entry {}", cart_id, line.quantity, entry_id);
    Ok(line)
}

/// Removes the line for an entry from a cart.
///
/// Removing an entry that is not in the cart is a no-op; the returned flag says
/// whether a line was deleted.
///
/// # Errors
/// Returns an error if the cart does not exist or has been checked out.
#[instrument(skip(db))]
pub async fn remove_from_cart<C>(db: &C, cart_id: i64, entry_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    require_open_cart(db, cart_id).await?;

    let result = CartLine::delete_many()
        .filter(cart_line::Column::CartId.eq(cart_id))
        .filter(cart_line::Column::CatalogEntryId.eq(entry_id))
        .exec(db)
        .await?;

    if result.rows_affected > 0 {
        touch_cart(db, cart_id).await?;
    }
    Ok(result.rows_affected > 0)
}

/// Overwrites the quantity of an existing line. A quantity of zero deletes the line
/// and returns `None`.
///
/// # Errors
/// Returns an error if:
/// - `quantity` is negative
/// - The cart does not exist, is checked out, or has no line for the entry
#[instrument(skip(db))]
pub async fn set_line_quantity<C>(
    db: &C,
    cart_id: i64,
    entry_id: i64,
    quantity: i32,
) -> Result<Option<cart_line::Model>>
where
    C: ConnectionTrait,
{
    if quantity < 0 {
        return Err(Error::validation(format!(
            "Quantity cannot be negative (got {quantity})"
        )));
    }

    require_open_cart(db, cart_id).await?;
    let line = find_line(db, cart_id, entry_id)
        .await?
        .ok_or_else(|| Error::not_found("Cart line", format!("{cart_id}/{entry_id}")))?;

    let updated = if quantity == 0 {
        line.delete(db).await?;
        None
    } else {
        let mut line: cart_line::ActiveModel = line.into();
        line.quantity = Set(quantity);
        Some(line.update(db).await?)
    };

    touch_cart(db, cart_id).await?;
    Ok(updated)
}

/// Prices every line of a cart on `as_of`.
///
/// # Errors
/// Returns an error if a line references a missing catalog entry or the database
/// query fails. An unknown cart prices as no lines.
pub async fn priced_lines<C>(db: &C, cart_id: i64, as_of: NaiveDate) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    Ok(get_lines_with_entries(db, cart_id)
        .await?
        .into_iter()
        .map(|(line, entry)| {
            let unit_price = pricing::effective_unit_price(&entry, as_of);
            PricedLine {
                line_id: line.id,
                catalog_entry_id: entry.id,
                name: entry.name,
                quantity: line.quantity,
                unit_price,
                line_total: unit_price * Decimal::from(line.quantity),
            }
        })
        .collect())
}

/// Sum of `quantity * effective unit price` over the cart's lines on `as_of`.
/// An empty cart has a subtotal of zero.
///
/// # Errors
/// Returns [`Error::NotFound`] if the cart does not exist.
pub async fn compute_subtotal<C>(db: &C, cart_id: i64, as_of: NaiveDate) -> Result<Decimal>
where
    C: ConnectionTrait,
{
    require_cart(db, cart_id).await?;
    let lines = get_lines_with_entries(db, cart_id).await?;
    Ok(pricing::subtotal(
        lines.iter().map(|(line, entry)| (line.quantity, entry)),
        as_of,
    ))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Days;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_add_to_cart_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result = add_to_cart(&db, 1, 1, 0).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = add_to_cart(&db, 1, 1, -4).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = set_line_quantity(&db, 1, 1, -1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_merged_quantity_cannot_overflow() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;

        add_to_cart(&db, cart.id, entry.id, i32::MAX).await?;
        let result = add_to_cart(&db, cart.id, entry.id, 1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // The line is untouched and the cart still prices
        let lines = get_lines(&db, cart.id).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, i32::MAX);
        let subtotal = compute_subtotal(&db, cart.id, date(2024, 1, 1)).await?;
        assert_eq!(subtotal, Decimal::from(i32::MAX) * Decimal::from(100));

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_up_to_max_quantity() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;

        add_to_cart(&db, cart.id, entry.id, i32::MAX - 1).await?;
        let line = add_to_cart(&db, cart.id, entry.id, 1).await?;
        assert_eq!(line.quantity, i32::MAX);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_adds_accumulate() -> Result<()> {
        let (db, path) = setup_file_test_db("concurrent-adds").await?;
        let entry = create_test_entry(&db, "Shared Entry", 10).await?;
        let cart = create_cart(&db).await?;

        let (a, b, c, d) = tokio::join!(
            add_to_cart(&db, cart.id, entry.id, 1),
            add_to_cart(&db, cart.id, entry.id, 2),
            add_to_cart(&db, cart.id, entry.id, 3),
            add_to_cart(&db, cart.id, entry.id, 4),
        );
        a?;
        b?;
        c?;
        d?;

        let lines = get_lines(&db, cart.id).await?;
        remove_test_db(&path);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 10);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_same_entry_merges_lines() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;

        add_to_cart(&db, cart.id, entry.id, 3).await?;
        let line = add_to_cart(&db, cart.id, entry.id, 3).await?;
        assert_eq!(line.quantity, 6);

        let lines = get_lines(&db, cart.id).await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 6);
        assert_eq!(lines[0].catalog_entry_id, entry.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_merge_for_various_quantities() -> Result<()> {
        let db = setup_test_db().await?;
        let entry = create_test_entry(&db, "Entry", 10).await?;

        for (q1, q2) in [(1, 1), (2, 5), (7, 1), (100, 250)] {
            let cart = create_cart(&db).await?;
            add_to_cart(&db, cart.id, entry.id, q1).await?;
            add_to_cart(&db, cart.id, entry.id, q2).await?;

            let lines = get_lines(&db, cart.id).await?;
            assert_eq!(lines.len(), 1);
            assert_eq!(lines[0].quantity, q1 + q2);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_lines_are_scoped_per_cart() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        let other = create_cart(&db).await?;

        add_to_cart(&db, cart.id, entry.id, 2).await?;
        add_to_cart(&db, other.id, entry.id, 5).await?;

        assert_eq!(get_lines(&db, cart.id).await?[0].quantity, 2);
        assert_eq!(get_lines(&db, other.id).await?[0].quantity, 5);

        Ok(())
    }

    #[tokio::test]
    async fn test_lines_keep_insertion_order() -> Result<()> {
        let (db, cart, first) = setup_with_cart_and_entry().await?;
        let second = create_test_entry(&db, "A second entry", 5).await?;

        add_to_cart(&db, cart.id, first.id, 1).await?;
        add_to_cart(&db, cart.id, second.id, 1).await?;
        add_to_cart(&db, cart.id, first.id, 1).await?;

        let ids: Vec<_> = get_lines(&db, cart.id)
            .await?
            .iter()
            .map(|l| l.catalog_entry_id)
            .collect();
        assert_eq!(ids, [first.id, second.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_add_to_cart_unknown_references() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;

        let result = add_to_cart(&db, 999, entry.id, 1).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound { entity: "Cart", .. }
        ));

        let result = add_to_cart(&db, cart.id, 999, 1).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "Catalog entry",
                ..
            }
        ));
        assert!(get_lines(&db, cart.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_checked_out_cart_is_read_only() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        add_to_cart(&db, cart.id, entry.id, 1).await?;
        mark_checked_out(&db, cart.id).await?;

        let result = add_to_cart(&db, cart.id, entry.id, 1).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = remove_from_cart(&db, cart.id, entry.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_from_cart() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        add_to_cart(&db, cart.id, entry.id, 2).await?;

        assert!(remove_from_cart(&db, cart.id, entry.id).await?);
        assert!(get_lines(&db, cart.id).await?.is_empty());

        // Removing again is a no-op rather than an error
        assert!(!remove_from_cart(&db, cart.id, entry.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_set_line_quantity() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        add_to_cart(&db, cart.id, entry.id, 2).await?;

        let line = set_line_quantity(&db, cart.id, entry.id, 5).await?.unwrap();
        assert_eq!(line.quantity, 5);

        // Zero deletes the line
        assert!(set_line_quantity(&db, cart.id, entry.id, 0).await?.is_none());
        assert!(get_lines(&db, cart.id).await?.is_empty());

        let result = set_line_quantity(&db, cart.id, entry.id, 3).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "Cart line",
                ..
            }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_basic_cart_subtotal() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        add_to_cart(&db, cart.id, entry.id, 3).await?;

        let subtotal = compute_subtotal(&db, cart.id, date(2026, 10, 19)).await?;
        assert_eq!(subtotal, Decimal::from(300));

        Ok(())
    }

    #[tokio::test]
    async fn test_subtotal_with_active_promotion() -> Result<()> {
        let db = setup_test_db().await?;
        let today = date(2026, 10, 19);
        let entry = create_promo_entry(
            &db,
            "Promo entry",
            100,
            80,
            today.checked_sub_days(Days::new(1)).unwrap(),
            today.checked_add_days(Days::new(1)).unwrap(),
        )
        .await?;
        let cart = create_cart(&db).await?;
        add_to_cart(&db, cart.id, entry.id, 1).await?;

        assert_eq!(compute_subtotal(&db, cart.id, today).await?, Decimal::from(80));

        // Once the window closes the base price applies again
        let later = today.checked_add_days(Days::new(2)).unwrap();
        assert_eq!(compute_subtotal(&db, cart.id, later).await?, Decimal::from(100));

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cart_subtotal_is_zero() -> Result<()> {
        let db = setup_test_db().await?;
        let cart = create_cart(&db).await?;

        assert_eq!(
            compute_subtotal(&db, cart.id, date(2026, 1, 1)).await?,
            Decimal::ZERO
        );

        let missing = compute_subtotal(&db, 999, date(2026, 1, 1)).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_priced_lines() -> Result<()> {
        let db = setup_test_db().await?;
        let d = date(2026, 7, 1);
        let plain = create_test_entry(&db, "Plain", 40).await?;
        let promo = create_promo_entry(&db, "Promo", 50, 30, d, d).await?;
        let cart = create_cart(&db).await?;
        add_to_cart(&db, cart.id, plain.id, 2).await?;
        add_to_cart(&db, cart.id, promo.id, 3).await?;

        let lines = priced_lines(&db, cart.id, d).await?;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].name, "Plain");
        assert_eq!(lines[0].line_total, Decimal::from(80));
        assert_eq!(lines[1].unit_price, Decimal::from(30));
        assert_eq!(lines[1].line_total, Decimal::from(90));

        Ok(())
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_lines() -> Result<()> {
        let (db, cart, entry) = setup_with_cart_and_entry().await?;
        add_to_cart(&db, cart.id, entry.id, 1).await?;

        let duplicate = cart_line::ActiveModel {
            cart_id: Set(cart.id),
            catalog_entry_id: Set(entry.id),
            quantity: Set(1),
            ..Default::default()
        };
        assert!(duplicate.insert(&db).await.is_err());

        Ok(())
    }
}
