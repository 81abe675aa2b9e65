//! Coupon request handlers.

use super::{OperationResult, cart::CartSummary, cart::summarize, resolve_date};
use crate::{core::coupon, errors::Result};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use tracing::instrument;

/// `{cart_id, coupon_code}`
#[derive(Debug, Clone, Deserialize)]
pub struct AttachCouponRequest {
    /// Target cart
    pub cart_id: i64,
    /// Code typed by the shopper
    pub coupon_code: String,
}

/// Attaches a coupon and returns the re-priced cart.
#[instrument(skip(db))]
pub async fn attach_coupon(
    db: &DatabaseConnection,
    request: AttachCouponRequest,
    as_of: Option<NaiveDate>,
) -> OperationResult<CartSummary> {
    let as_of = resolve_date(as_of);
    let result: Result<CartSummary> = async {
        coupon::attach_coupon(db, request.cart_id, &request.coupon_code, as_of).await?;
        summarize(db, request.cart_id, as_of).await
    }
    .await;
    result.into()
}
