//! Applies the products schema migrations and verifies the result.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use promo_db::{run_migrations, verify_columns, PgProductStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

    info!("==========================================");
    info!("Running database migrations");
    info!("==========================================");

    let store = PgProductStore::connect(&database_url)
        .await
        .context("failed to connect to database")?;

    run_migrations(store.pool())
        .await
        .context("migration failed")?;

    let columns = verify_columns(store.pool())
        .await
        .context("column verification failed")?;
    for column in &columns {
        info!(
            "  {} {} (nullable: {})",
            column.column_name, column.data_type, column.is_nullable
        );
    }

    info!("==========================================");
    info!("Migrations complete");
    info!("==========================================");
    Ok(())
}
