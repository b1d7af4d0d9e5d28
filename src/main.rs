use dotenvy::dotenv;
use pos_hub::{
    config::{database, settings, users},
    core::{auth, catalog, report, seed, storage::ImageBucket},
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = settings::load_app_configuration()?;

    // 4. Connect and make sure every table exists
    let bucket = ImageBucket::from_config(&app_config.storage);
    tokio::fs::create_dir_all(bucket.root()).await?;
    let database_url = database::get_database_url(app_config.database_url.as_deref());
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the catalog from config.toml
    seed::seed_catalog(&db, &app_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Make sure an admin account exists
    match users::get_admin_bootstrap() {
        Some(admin) => {
            let profile = auth::bootstrap_admin(&db, &admin)
                .await
                .inspect_err(|e| error!("Failed to bootstrap admin account: {}", e))?;
            info!("Admin account ready: {}", profile.email);
        }
        None => warn!("POS_ADMIN_EMAIL/POS_ADMIN_PASSWORD not set; no admin account bootstrapped"),
    }

    // 7. Startup summary
    let categories = catalog::list_categories(&db).await?;
    let featured = catalog::featured_products(&db, None).await?;
    let today = report::daily_close(&db, chrono::Utc::now().date_naive()).await?;
    info!(
        categories = categories.len(),
        featured = featured.len(),
        shipping_zones = app_config.shipping_zones.len(),
        "Catalog ready"
    );
    info!(
        courier_delivery_fee = app_config.pricing.courier_delivery_fee,
        seller_commission_rate = app_config.pricing.seller_commission_rate,
        "Dashboard rates loaded"
    );
    info!(
        orders = today.count,
        total = today.total,
        paid = today.paid,
        pending = today.pending(),
        "Today's sales so far"
    );

    Ok(())
}
