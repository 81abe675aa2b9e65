//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cart;
pub mod cart_line;
pub mod catalog_entry;
pub mod coupon;

// Re-export specific types to avoid conflicts
pub use cart::{Column as CartColumn, Entity as Cart, Model as CartModel};
pub use cart_line::{Column as CartLineColumn, Entity as CartLine, Model as CartLineModel};
pub use catalog_entry::{
    Column as CatalogEntryColumn, Entity as CatalogEntry, Model as CatalogEntryModel,
};
pub use coupon::{Column as CouponColumn, Entity as Coupon, Model as CouponModel};
