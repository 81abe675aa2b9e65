//! Coupon business logic - Eligibility, attachment to carts, and cart totals.
//!
//! Eligibility is checked when a coupon is attached. Totals re-check it on the
//! requested date: a coupon that lapsed after being attached stays on the cart but
//! its discount is withheld, and [`CartTotal::coupon_applied`] reports this to the
//! caller. Usage is only counted when an order is finalized (see
//! [`crate::core::checkout`]), through [`redeem_coupon`].

use crate::{
    core::{cart as cart_ops, pricing},
    entities::{Cart, Coupon, cart, coupon},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::fmt;
use tracing::{info, instrument, warn};

/// Input for [`create_coupon`].
#[derive(Debug, Clone)]
pub struct NewCoupon {
    /// Code typed by shoppers
    pub code: String,
    /// Human-readable label
    pub label: String,
    /// Fraction taken off the subtotal, in `[0, 1]`
    pub reduction: Decimal,
    /// Whether the coupon is switched on
    pub active: bool,
    /// Last valid day
    pub expires_on: NaiveDate,
    /// Maximum number of redemptions
    pub usage_cap: i32,
}

/// Outcome of the eligibility checks for a coupon on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    /// All checks pass
    Valid,
    /// The coupon has been switched off
    Inactive,
    /// The date is past the expiry date
    Expired,
    /// The usage cap has been reached
    Exhausted,
}

impl fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Valid => "valid",
            Self::Inactive => "coupon is inactive",
            Self::Expired => "coupon has expired",
            Self::Exhausted => "coupon usage limit reached",
        };
        f.write_str(text)
    }
}

/// Price breakdown of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartTotal {
    /// Sum of line totals before any coupon
    pub subtotal: Decimal,
    /// Amount taken off by the coupon
    pub discount: Decimal,
    /// Amount due; never negative and never above the subtotal
    pub total: Decimal,
    /// Code of the attached coupon, applied or not
    pub coupon_code: Option<String>,
    /// False when no coupon is attached or the attached one is no longer valid
    pub coupon_applied: bool,
}

/// Runs the eligibility checks in order: active flag, expiry, usage cap.
#[must_use]
pub fn coupon_status(coupon: &coupon::Model, as_of: NaiveDate) -> CouponStatus {
    if !coupon.active {
        CouponStatus::Inactive
    } else if as_of > coupon.expires_on {
        CouponStatus::Expired
    } else if coupon.usage_count >= coupon.usage_cap {
        CouponStatus::Exhausted
    } else {
        CouponStatus::Valid
    }
}

/// True iff the coupon is active, not expired on `as_of`, and below its usage cap.
#[must_use]
pub fn validate_coupon(coupon: &coupon::Model, as_of: NaiveDate) -> bool {
    coupon_status(coupon, as_of) == CouponStatus::Valid
}

/// Combines a subtotal with an optional attached coupon.
#[must_use]
pub fn price_with_coupon(
    subtotal: Decimal,
    coupon: Option<&coupon::Model>,
    as_of: NaiveDate,
) -> CartTotal {
    let applied = coupon.filter(|c| validate_coupon(c, as_of));
    let total = applied.map_or(subtotal, |c| pricing::apply_reduction(subtotal, c.reduction));

    CartTotal {
        subtotal,
        discount: subtotal - total,
        total,
        coupon_code: coupon.map(|c| c.code.clone()),
        coupon_applied: applied.is_some(),
    }
}

/// Creates a coupon after validating its fields. Usage starts at zero.
///
/// # Errors
/// Returns an error if:
/// - The code is empty or whitespace-only
/// - The reduction is outside `[0, 1]`
/// - The usage cap is negative
/// - The code is already taken or the insert fails
#[instrument(skip(db, new_coupon), fields(code = %new_coupon.code))]
pub async fn create_coupon<C>(db: &C, new_coupon: NewCoupon) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    let code = new_coupon.code.trim();
    if code.is_empty() {
        return Err(Error::validation("Coupon code cannot be empty"));
    }
    if new_coupon.reduction < Decimal::ZERO || new_coupon.reduction > Decimal::ONE {
        return Err(Error::validation(format!(
            "Coupon reduction must be between 0 and 1 (got {})",
            new_coupon.reduction
        )));
    }
    if new_coupon.usage_cap < 0 {
        return Err(Error::validation(format!(
            "Coupon usage cap cannot be negative (got {})",
            new_coupon.usage_cap
        )));
    }

    let coupon = coupon::ActiveModel {
        code: Set(code.to_string()),
        label: Set(new_coupon.label),
        reduction: Set(new_coupon.reduction),
        active: Set(new_coupon.active),
        expires_on: Set(new_coupon.expires_on),
        usage_cap: Set(new_coupon.usage_cap),
        usage_count: Set(0),
        ..Default::default()
    };
    coupon.insert(db).await.map_err(Into::into)
}

/// Finds a coupon by code, ignoring surrounding whitespace.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_coupon_by_code<C>(db: &C, code: &str) -> Result<Option<coupon::Model>>
where
    C: ConnectionTrait,
{
    Coupon::find()
        .filter(coupon::Column::Code.eq(code.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a coupon by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_coupon_by_id<C>(db: &C, coupon_id: i64) -> Result<Option<coupon::Model>>
where
    C: ConnectionTrait,
{
    Coupon::find_by_id(coupon_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Switches a coupon on or off.
///
/// # Errors
/// Returns [`Error::NotFound`] if the coupon does not exist, or an error if the
/// database update fails.
#[instrument(skip(db))]
pub async fn set_coupon_active<C>(db: &C, coupon_id: i64, active: bool) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    let mut coupon: coupon::ActiveModel = get_coupon_by_id(db, coupon_id)
        .await?
        .ok_or_else(|| Error::not_found("Coupon", coupon_id))?
        .into();
    coupon.active = Set(active);
    coupon.update(db).await.map_err(Into::into)
}

/// Attaches a coupon to a cart, replacing any coupon already attached.
///
/// # Errors
/// Returns an error if:
/// - The code is blank
/// - The cart or coupon does not exist, or the cart is checked out
/// - The coupon is not valid on `as_of` ([`Error::CouponInvalid`]); the cart is left unchanged
#[instrument(skip(db))]
pub async fn attach_coupon<C>(
    db: &C,
    cart_id: i64,
    code: &str,
    as_of: NaiveDate,
) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    if code.trim().is_empty() {
        return Err(Error::validation("Coupon code cannot be empty"));
    }

    let cart = cart_ops::require_open_cart(db, cart_id).await?;
    let coupon = get_coupon_by_code(db, code)
        .await?
        .ok_or_else(|| Error::not_found("Coupon", code.trim()))?;

    let status = coupon_status(&coupon, as_of);
    if status != CouponStatus::Valid {
        warn!("Rejected coupon {} for cart {}: {}", coupon.code, cart_id, status);
        return Err(Error::CouponInvalid {
            code: coupon.code,
            reason: status.to_string(),
        });
    }

    if let Some(previous) = cart.coupon_id.filter(|id| *id != coupon.id) {
        info!("Cart {} replaces coupon {} with {}", cart_id, previous, coupon.code);
    }

    let mut cart: cart::ActiveModel = cart.into();
    cart.coupon_id = Set(Some(coupon.id));
    cart.updated_at = Set(chrono::Utc::now().naive_utc());
    cart.update(db).await.map_err(Into::into)
}

/// Removes the coupon from a cart. Detaching from a cart without a coupon is a no-op.
///
/// # Errors
/// Returns an error if the cart does not exist, has been checked out, or the
/// database update fails.
#[instrument(skip(db))]
pub async fn detach_coupon<C>(db: &C, cart_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let cart = cart_ops::require_open_cart(db, cart_id).await?;
    if cart.coupon_id.is_none() {
        return Ok(cart);
    }

    let mut cart: cart::ActiveModel = cart.into();
    cart.coupon_id = Set(None);
    cart.updated_at = Set(chrono::Utc::now().naive_utc());
    cart.update(db).await.map_err(Into::into)
}

/// Computes the subtotal, discount and total of a cart on `as_of`.
///
/// # Errors
/// Returns [`Error::NotFound`] if the cart, or its attached coupon, does not exist.
pub async fn compute_total<C>(db: &C, cart_id: i64, as_of: NaiveDate) -> Result<CartTotal>
where
    C: ConnectionTrait,
{
    let cart = Cart::find_by_id(cart_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Cart", cart_id))?;
    let subtotal = cart_ops::compute_subtotal(db, cart_id, as_of).await?;

    let coupon = match cart.coupon_id {
        Some(coupon_id) => Some(
            get_coupon_by_id(db, coupon_id)
                .await?
                .ok_or_else(|| Error::not_found("Coupon", coupon_id))?,
        ),
        None => None,
    };

    let total = price_with_coupon(subtotal, coupon.as_ref(), as_of);
    if let Some(code) = total.coupon_code.as_deref().filter(|_| !total.coupon_applied) {
        warn!("Coupon {} on cart {} is no longer valid; discount withheld", code, cart_id);
    }
    Ok(total)
}

/// Counts one use of a coupon.
///
/// The increment is a single conditional `UPDATE`, so concurrent redemptions can
/// never push `usage_count` past `usage_cap`.
///
/// # Errors
/// Returns [`Error::CouponInvalid`] when the coupon is no longer redeemable on `as_of`.
#[instrument(skip(db))]
pub async fn redeem_coupon<C>(db: &C, coupon_id: i64, as_of: NaiveDate) -> Result<coupon::Model>
where
    C: ConnectionTrait,
{
    let result = Coupon::update_many()
        .col_expr(
            coupon::Column::UsageCount,
            Expr::col(coupon::Column::UsageCount).add(1),
        )
        .filter(coupon::Column::Id.eq(coupon_id))
        .filter(coupon::Column::Active.eq(true))
        .filter(coupon::Column::ExpiresOn.gte(as_of))
        .filter(Expr::col(coupon::Column::UsageCount).lt(Expr::col(coupon::Column::UsageCap)))
        .exec(db)
        .await?;

    let coupon = get_coupon_by_id(db, coupon_id)
        .await?
        .ok_or_else(|| Error::not_found("Coupon", coupon_id))?;

    if result.rows_affected == 0 {
        return Err(Error::CouponInvalid {
            reason: coupon_status(&coupon, as_of).to_string(),
            code: coupon.code,
        });
    }
    Ok(coupon)
}
