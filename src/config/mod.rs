/// Database configuration and connection management
pub mod database;

/// Catalog and coupon seed configuration from config.toml
pub mod seed;
