//! Cart request handlers.

use super::{OperationResult, resolve_date};
use crate::{
    core::{
        cart::{self, PricedLine},
        checkout::{self, CheckoutSummary},
        coupon::{self, CartTotal},
    },
    entities::cart_line,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// `{cart_id, catalog_entry_id, quantity}`
#[derive(Debug, Clone, Deserialize)]
pub struct AddToCartRequest {
    /// Target cart
    pub cart_id: i64,
    /// Entry to add
    pub catalog_entry_id: i64,
    /// Units to add; missing is a validation error
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// `{cart_id, catalog_entry_id}`
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveFromCartRequest {
    /// Target cart
    pub cart_id: i64,
    /// Entry whose line is removed
    pub catalog_entry_id: i64,
}

/// `{cart_id}`, used for totals and checkout
#[derive(Debug, Clone, Deserialize)]
pub struct CartRequest {
    /// Target cart
    pub cart_id: i64,
}

/// Full view of a cart's pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSummary {
    /// Cart identifier
    pub cart_id: i64,
    /// Priced lines in insertion order
    pub lines: Vec<PricedLine>,
    /// Subtotal, discount and total
    pub totals: CartTotal,
}

fn parse_quantity(quantity: Option<i64>) -> Result<i32> {
    let quantity = quantity.ok_or_else(|| Error::validation("Quantity is required"))?;
    i32::try_from(quantity)
        .ok()
        .filter(|q| *q > 0)
        .ok_or_else(|| {
            Error::validation(format!(
                "Quantity must be a positive integer (got {quantity})"
            ))
        })
}

/// Handles an add-to-cart request.
#[instrument(skip(db))]
pub async fn add_to_cart(
    db: &DatabaseConnection,
    request: AddToCartRequest,
) -> OperationResult<cart_line::Model> {
    let result: Result<cart_line::Model> = async {
        let quantity = parse_quantity(request.quantity)?;
        cart::add_to_cart(db, request.cart_id, request.catalog_entry_id, quantity).await
    }
    .await;
    result.into()
}

/// Handles a remove-from-cart request. `data` says whether a line was removed.
#[instrument(skip(db))]
pub async fn remove_from_cart(
    db: &DatabaseConnection,
    request: RemoveFromCartRequest,
) -> OperationResult<bool> {
    cart::remove_from_cart(db, request.cart_id, request.catalog_entry_id)
        .await
        .into()
}

/// Handles a cart-total request.
#[instrument(skip(db))]
pub async fn cart_total(
    db: &DatabaseConnection,
    request: CartRequest,
    as_of: Option<NaiveDate>,
) -> OperationResult<CartSummary> {
    summarize(db, request.cart_id, resolve_date(as_of))
        .await
        .into()
}

pub(super) async fn summarize(
    db: &DatabaseConnection,
    cart_id: i64,
    as_of: NaiveDate,
) -> Result<CartSummary> {
    let totals = coupon::compute_total(db, cart_id, as_of).await?;
    let lines = cart::priced_lines(db, cart_id, as_of).await?;
    Ok(CartSummary {
        cart_id,
        lines,
        totals,
    })
}

/// Handles a checkout request.
#[instrument(skip(db))]
pub async fn checkout(
    db: &DatabaseConnection,
    request: CartRequest,
    as_of: Option<NaiveDate>,
) -> OperationResult<CheckoutSummary> {
    checkout::finalize_cart(db, request.cart_id, resolve_date(as_of))
        .await
        .into()
}
