//! Seed configuration loading from config.toml
//!
//! The catalog entries and coupons listed in config.toml are inserted on start-up
//! when they are missing from the database. Dates are written as quoted
//! `"YYYY-MM-DD"` strings.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Default, Deserialize)]
pub struct SeedConfig {
    /// Catalog entries to seed
    #[serde(default)]
    pub catalog: Vec<CatalogEntryConfig>,
    /// Coupons to seed
    #[serde(default)]
    pub coupons: Vec<CouponConfig>,
}

/// Configuration for a single catalog entry
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogEntryConfig {
    /// Entry name, used to detect already-seeded entries
    pub name: String,
    /// Description shown with the deal
    #[serde(default)]
    pub description: String,
    /// Regular unit price
    pub base_price: Decimal,
    /// Promotional unit price
    #[serde(default)]
    pub promo_price: Option<Decimal>,
    /// First day of the promotion
    #[serde(default)]
    pub promo_start: Option<NaiveDate>,
    /// Last day of the promotion
    #[serde(default)]
    pub promo_end: Option<NaiveDate>,
}

/// Configuration for a single coupon
#[derive(Debug, Deserialize, Clone)]
pub struct CouponConfig {
    /// Code typed by shoppers
    pub code: String,
    /// Human-readable label
    #[serde(default)]
    pub label: String,
    /// Fraction taken off the subtotal
    pub reduction: Decimal,
    /// Whether the coupon starts active
    #[serde(default = "default_active")]
    pub active: bool,
    /// Last valid day
    pub expires_on: NaiveDate,
    /// Maximum number of redemptions
    pub usage_cap: i32,
}

const fn default_active() -> bool {
    true
}

/// Loads seed configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading seed configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses seed configuration from TOML text.
///
/// # Errors
/// Returns [`Error::Config`] if the contents are not valid seed TOML.
pub fn parse_config(contents: &str) -> Result<SeedConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads seed configuration from `STOREFRONT_CONFIG`, or ./config.toml when unset.
///
/// # Errors
/// Returns an error if the configured file cannot be read or parsed.
pub fn load_default_config() -> Result<SeedConfig> {
    let path =
        std::env::var("STOREFRONT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}
