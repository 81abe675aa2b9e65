//! Catalog business logic - Creating, querying and re-pricing catalog entries.
//!
//! Promotion windows are validated on write (both bounds or neither, start not after
//! end) so that pricing can treat any stored window as well formed. Seeding from
//! `config.toml` also lives here since it is the only bulk writer of entries.

use crate::{
    config::seed::SeedConfig,
    core::coupon::{self, NewCoupon},
    entities::{CatalogEntry, Coupon, catalog_entry, coupon as coupon_entity},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{info, instrument};

/// Input for [`create_entry`].
#[derive(Debug, Clone)]
pub struct NewCatalogEntry {
    /// Display name
    pub name: String,
    /// Description of the deal
    pub description: String,
    /// Regular unit price
    pub base_price: Decimal,
    /// Optional promotional price
    pub promo_price: Option<Decimal>,
    /// Promotion start (inclusive)
    pub promo_start: Option<NaiveDate>,
    /// Promotion end (inclusive)
    pub promo_end: Option<NaiveDate>,
}

impl NewCatalogEntry {
    /// An entry with only a base price.
    pub fn new(name: impl Into<String>, base_price: Decimal) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            base_price,
            promo_price: None,
            promo_start: None,
            promo_end: None,
        }
    }

    /// Adds a promotion window to the entry.
    #[must_use]
    pub fn with_promotion(
        mut self,
        promo_price: Decimal,
        promo_start: NaiveDate,
        promo_end: NaiveDate,
    ) -> Self {
        self.promo_price = Some(promo_price);
        self.promo_start = Some(promo_start);
        self.promo_end = Some(promo_end);
        self
    }
}

/// Counts returned by [`seed_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Catalog entries inserted
    pub entries_created: usize,
    /// Coupons inserted
    pub coupons_created: usize,
}

fn validate_price(price: Decimal, field: &str) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(Error::validation(format!(
            "{field} cannot be negative (got {price})"
        )));
    }
    Ok(())
}

fn validate_promotion(
    promo_price: Option<Decimal>,
    promo_start: Option<NaiveDate>,
    promo_end: Option<NaiveDate>,
) -> Result<()> {
    if let Some(price) = promo_price {
        validate_price(price, "Promotional price")?;
    }
    match (promo_start, promo_end) {
        (Some(start), Some(end)) if start > end => Err(Error::validation(format!(
            "Promotion starts ({start}) after it ends ({end})"
        ))),
        (Some(_), None) | (None, Some(_)) => Err(Error::validation(
            "Promotion start and end must be given together",
        )),
        _ => Ok(()),
    }
}

/// Creates a catalog entry after validating its name, prices and promotion window.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or whitespace-only
/// - A price is negative
/// - Only one promotion bound is given, or start is after end
/// - The database insert fails
#[instrument(skip(db, new_entry), fields(name = %new_entry.name))]
pub async fn create_entry<C>(db: &C, new_entry: NewCatalogEntry) -> Result<catalog_entry::Model>
where
    C: ConnectionTrait,
{
    if new_entry.name.trim().is_empty() {
        return Err(Error::validation("Catalog entry name cannot be empty"));
    }
    validate_price(new_entry.base_price, "Base price")?;
    validate_promotion(
        new_entry.promo_price,
        new_entry.promo_start,
        new_entry.promo_end,
    )?;

    let now = chrono::Utc::now().naive_utc();
    let entry = catalog_entry::ActiveModel {
        name: Set(new_entry.name.trim().to_string()),
        description: Set(new_entry.description),
        base_price: Set(new_entry.base_price),
        promo_price: Set(new_entry.promo_price),
        promo_start: Set(new_entry.promo_start),
        promo_end: Set(new_entry.promo_end),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Retrieves a catalog entry by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_entry_by_id<C>(db: &C, entry_id: i64) -> Result<Option<catalog_entry::Model>>
where
    C: ConnectionTrait,
{
    CatalogEntry::find_by_id(entry_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a catalog entry by its exact name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_entry_by_name<C>(db: &C, name: &str) -> Result<Option<catalog_entry::Model>>
where
    C: ConnectionTrait,
{
    CatalogEntry::find()
        .filter(catalog_entry::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every catalog entry, alphabetically by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_entries<C>(db: &C) -> Result<Vec<catalog_entry::Model>>
where
    C: ConnectionTrait,
{
    CatalogEntry::find()
        .order_by_asc(catalog_entry::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sets or replaces the promotion of an entry.
///
/// # Errors
/// Returns an error if the price is negative, `start` is after `end`, or the
/// entry does not exist.
#[instrument(skip(db))]
pub async fn update_promotion<C>(
    db: &C,
    entry_id: i64,
    promo_price: Decimal,
    promo_start: NaiveDate,
    promo_end: NaiveDate,
) -> Result<catalog_entry::Model>
where
    C: ConnectionTrait,
{
    validate_promotion(Some(promo_price), Some(promo_start), Some(promo_end))?;

    let mut entry: catalog_entry::ActiveModel = get_entry_by_id(db, entry_id)
        .await?
        .ok_or_else(|| Error::not_found("Catalog entry", entry_id))?
        .into();

    entry.promo_price = Set(Some(promo_price));
    entry.promo_start = Set(Some(promo_start));
    entry.promo_end = Set(Some(promo_end));
    entry.updated_at = Set(chrono::Utc::now().naive_utc());

    entry.update(db).await.map_err(Into::into)
}

/// Removes any promotion from an entry.
///
/// # Errors
/// Returns [`Error::NotFound`] if the entry does not exist, or an error if the
/// database update fails.
#[instrument(skip(db))]
pub async fn clear_promotion<C>(db: &C, entry_id: i64) -> Result<catalog_entry::Model>
where
    C: ConnectionTrait,
{
    let mut entry: catalog_entry::ActiveModel = get_entry_by_id(db, entry_id)
        .await?
        .ok_or_else(|| Error::not_found("Catalog entry", entry_id))?
        .into();

    entry.promo_price = Set(None);
    entry.promo_start = Set(None);
    entry.promo_end = Set(None);
    entry.updated_at = Set(chrono::Utc::now().naive_utc());

    entry.update(db).await.map_err(Into::into)
}

/// Inserts the configured entries and coupons that are not in the database yet.
///
/// Entries are matched by name and coupons by code, so running this on every
/// start-up is safe.
///
/// # Errors
/// Returns an error if a configured entry or coupon fails validation, or if a
/// database operation fails.
#[instrument(skip_all)]
pub async fn seed_catalog<C>(db: &C, config: &SeedConfig) -> Result<SeedReport>
where
    C: ConnectionTrait,
{
    let mut report = SeedReport::default();

    for entry_config in &config.catalog {
        if get_entry_by_name(db, entry_config.name.trim()).await?.is_some() {
            continue;
        }
        create_entry(
            db,
            NewCatalogEntry {
                name: entry_config.name.clone(),
                description: entry_config.description.clone(),
                base_price: entry_config.base_price,
                promo_price: entry_config.promo_price,
                promo_start: entry_config.promo_start,
                promo_end: entry_config.promo_end,
            },
        )
        .await?;
        report.entries_created += 1;
    }

    for coupon_config in &config.coupons {
        let exists = Coupon::find()
            .filter(coupon_entity::Column::Code.eq(coupon_config.code.trim()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        coupon::create_coupon(
            db,
            NewCoupon {
                code: coupon_config.code.clone(),
                label: coupon_config.label.clone(),
                reduction: coupon_config.reduction,
                active: coupon_config.active,
                expires_on: coupon_config.expires_on,
                usage_cap: coupon_config.usage_cap,
            },
        )
        .await?;
        report.coupons_created += 1;
    }

    info!(
        "Seeded {} catalog entries and {} coupons",
        report.entries_created, report.coupons_created
    );
    Ok(report)
}
