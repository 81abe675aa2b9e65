//! Catalog entry entity - A sellable product with a base price.
//!
//! An entry may carry a promotional price bounded by an inclusive date window.
//! The promotion only applies when both bounds are present.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "catalog_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g., "Sunset dinner for two")
    pub name: String,
    /// Free-form description of the deal
    pub description: String,
    /// Regular unit price
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub base_price: Decimal,
    /// Unit price while the promotion window is open
    #[sea_orm(column_type = "Decimal(Some((16, 4)))", nullable)]
    pub promo_price: Option<Decimal>,
    /// First day of the promotion (inclusive)
    pub promo_start: Option<Date>,
    /// Last day of the promotion (inclusive)
    pub promo_end: Option<Date>,
    /// When the entry was created
    pub created_at: DateTime,
    /// When the entry was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between `CatalogEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One entry appears in many cart lines
    #[sea_orm(has_many = "super::cart_line::Entity")]
    CartLines,
}

impl Related<super::cart_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartLines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
