//! Cart line entity - One (catalog entry, quantity) pair inside a cart.
//!
//! A unique index on `(cart_id, catalog_entry_id)` is created alongside the table
//! (see `config::database::create_tables`), so a cart never holds two lines for
//! the same entry.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Cart line database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cart_lines")]
pub struct Model {
    /// Unique identifier; ascending ids give insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning cart
    pub cart_id: i64,
    /// Entry being purchased
    pub catalog_entry_id: i64,
    /// Number of units, always positive
    pub quantity: i32,
}

/// Defines relationships between `CartLine` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line belongs to one cart
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id"
    )]
    Cart,
    /// Each line references one catalog entry
    #[sea_orm(
        belongs_to = "super::catalog_entry::Entity",
        from = "Column::CatalogEntryId",
        to = "super::catalog_entry::Column::Id"
    )]
    CatalogEntry,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::catalog_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
