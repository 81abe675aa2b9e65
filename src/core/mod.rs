//! Core business logic - framework-agnostic pricing, cart, coupon and checkout operations.

/// Catalog entry management and seeding
pub mod catalog;
/// Cart line management and subtotals
pub mod cart;
/// Order finalization and coupon redemption
pub mod checkout;
/// Coupon eligibility, attachment and cart totals
pub mod coupon;
/// Pure pricing rules
pub mod pricing;
