//! Pricing rules - pure functions over catalog entries and cart contents.
//!
//! Nothing in this module touches the database. Every function takes the
//! evaluation date explicitly so results are deterministic; [`today`] supplies
//! the default used by the request layer.

use crate::entities::catalog_entry;
use chrono::{NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on money amounts produced by discounting.
const MONEY_SCALE: u32 = 2;

/// The current UTC calendar date.
#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Returns true when the entry's promotional price applies on `as_of`.
///
/// Requires a promo price and both window bounds; bounds are inclusive.
#[must_use]
pub fn is_promotion_active(entry: &catalog_entry::Model, as_of: NaiveDate) -> bool {
    match (entry.promo_price, entry.promo_start, entry.promo_end) {
        (Some(_), Some(start), Some(end)) => start <= as_of && as_of <= end,
        _ => false,
    }
}

/// The unit price charged for `entry` on `as_of`.
///
/// Falls back to the base price whenever the promotion is incomplete or outside
/// its window.
#[must_use]
pub fn effective_unit_price(entry: &catalog_entry::Model, as_of: NaiveDate) -> Decimal {
    match entry.promo_price {
        Some(promo) if is_promotion_active(entry, as_of) => promo,
        _ => entry.base_price,
    }
}

/// Price of `quantity` units of `entry` on `as_of`.
#[must_use]
pub fn line_total(entry: &catalog_entry::Model, quantity: i32, as_of: NaiveDate) -> Decimal {
    effective_unit_price(entry, as_of) * Decimal::from(quantity)
}

/// Sum of line totals for `(quantity, entry)` pairs. Zero when empty.
pub fn subtotal<'a, I>(lines: I, as_of: NaiveDate) -> Decimal
where
    I: IntoIterator<Item = (i32, &'a catalog_entry::Model)>,
{
    lines
        .into_iter()
        .map(|(quantity, entry)| line_total(entry, quantity, as_of))
        .sum()
}

/// Applies a fractional reduction to a subtotal.
///
/// The reduction is clamped to `[0, 1]`, so the result is never negative and
/// never exceeds the subtotal. Rounded to cents, midpoint away from zero.
#[must_use]
pub fn apply_reduction(subtotal: Decimal, reduction: Decimal) -> Decimal {
    let subtotal = subtotal.max(Decimal::ZERO);
    let reduction = reduction.clamp(Decimal::ZERO, Decimal::ONE);
    let total = subtotal * (Decimal::ONE - reduction);
    total
        .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .clamp(Decimal::ZERO, subtotal)
}
