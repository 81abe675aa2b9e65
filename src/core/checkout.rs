//! Checkout - Converting a cart into a finalized order total.
//!
//! Finalization is where coupon usage is counted. Everything runs inside one
//! database transaction: if the coupon redemption loses a race for the last
//! remaining use, the cart is left open and untouched.

use crate::{
    core::{
        cart::{PricedLine, priced_lines, require_open_cart},
        coupon::{CartTotal, get_coupon_by_id, price_with_coupon, redeem_coupon},
    },
    entities::cart,
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutSummary {
    /// Cart that was checked out
    pub cart_id: i64,
    /// Lines with the prices charged
    pub lines: Vec<PricedLine>,
    /// Totals charged
    pub totals: CartTotal,
    /// Pricing date
    pub as_of: NaiveDate,
}

/// Finalizes a cart: prices it, redeems its coupon if still valid, and marks it
/// checked out.
///
/// A coupon that lapsed since it was attached is not redeemed and gives no discount,
/// matching what [`crate::core::coupon::compute_total`] shows.
///
/// # Errors
/// Returns an error if:
/// - The cart does not exist
/// - The cart is empty or already checked out ([`Error::Validation`])
/// - The coupon's last use was taken concurrently ([`Error::CouponInvalid`])
/// - Any database operation fails
#[instrument(skip(db))]
pub async fn finalize_cart(
    db: &DatabaseConnection,
    cart_id: i64,
    as_of: NaiveDate,
) -> Result<CheckoutSummary> {
    let txn = db.begin().await?;

    let cart = require_open_cart(&txn, cart_id).await?;
    let lines = priced_lines(&txn, cart_id, as_of).await?;
    if lines.is_empty() {
        return Err(Error::validation(format!(
            "Cart {cart_id} is empty and cannot be checked out"
        )));
    }

    let coupon = match cart.coupon_id {
        Some(coupon_id) => Some(
            get_coupon_by_id(&txn, coupon_id)
                .await?
                .ok_or_else(|| Error::not_found("Coupon", coupon_id))?,
        ),
        None => None,
    };

    let subtotal: Decimal = lines.iter().map(|line| line.line_total).sum();
    let totals = price_with_coupon(subtotal, coupon.as_ref(), as_of);

    if let Some(coupon) = coupon.as_ref().filter(|_| totals.coupon_applied) {
        redeem_coupon(&txn, coupon.id, as_of).await?;
    }

    let mut cart: cart::ActiveModel = cart.into();
    cart.is_checked_out = Set(true);
    cart.updated_at = Set(chrono::Utc::now().naive_utc());
    cart.update(&txn).await?;

    txn.commit().await?;

    info!(
        "Checked out cart {} for {} ({} lines)",
        cart_id,
        totals.total,
        lines.len()
    );
    Ok(CheckoutSummary {
        cart_id,
        lines,
        totals,
        as_of,
    })
}
