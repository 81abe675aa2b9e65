use dotenvy::dotenv;
use storefront::{
    config::{database, seed},
    core::{catalog, pricing},
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the seed configuration
    let seed_config = seed::load_default_config()
        .inspect_err(|e| error!("Failed to load seed configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let database_url = database::get_database_url();
    database::ensure_sqlite_directory(&database_url)?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed catalog entries and coupons
    catalog::seed_catalog(&db, &seed_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Report today's prices
    let today = pricing::today();
    for entry in catalog::list_entries(&db).await? {
        let price = pricing::effective_unit_price(&entry, today);
        if pricing::is_promotion_active(&entry, today) {
            info!("{}: {} (promotion, base {})", entry.name, price, entry.base_price);
        } else {
            info!("{}: {}", entry.name, price);
        }
    }

    Ok(())
}
