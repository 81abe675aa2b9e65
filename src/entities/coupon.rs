//! Coupon entity - A percentage discount code.
//!
//! A coupon is usable while it is active, not past its expiry date and
//! below its usage cap.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Coupon database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    /// Unique identifier for the coupon
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Code typed by the shopper (e.g., `"PROMO10"`)
    #[sea_orm(unique)]
    pub code: String,
    /// Human-readable label
    pub label: String,
    /// Fraction taken off the subtotal, between 0 and 1
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub reduction: Decimal,
    /// Manual on/off switch
    pub active: bool,
    /// Last day the coupon can be used (inclusive)
    pub expires_on: Date,
    /// Maximum number of redemptions
    pub usage_cap: i32,
    /// Redemptions so far
    pub usage_count: i32,
}

/// Defines relationships between Coupon and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A coupon can be attached to many carts
    #[sea_orm(has_many = "super::cart::Entity")]
    Carts,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
