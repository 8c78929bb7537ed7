//! Datastore capability and its Postgres implementation.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info};

use promo_models::{ProductId, ProductRecord};

use crate::error::{DbError, DbResult};
use crate::products::{fetch_pending_products, mark_product_done};

/// The worker runs one product at a time; a couple of connections suffice.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 2;

/// Capability: list pending products and mark them done.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn fetch_pending(&self) -> DbResult<Vec<ProductRecord>>;

    async fn mark_done(&self, id: ProductId, url: &str) -> DbResult<()>;
}

/// [`ProductStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await
            .map_err(DbError::Connect)?;

        info!("Connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn fetch_pending(&self) -> DbResult<Vec<ProductRecord>> {
        let rows = fetch_pending_products(&self.pool).await?;
        debug!("Fetched {} pending products", rows.len());
        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn mark_done(&self, id: ProductId, url: &str) -> DbResult<()> {
        let updated = mark_product_done(&self.pool, id.get(), url).await?;
        if updated == 0 {
            return Err(DbError::RowNotFound(id.get()));
        }
        debug!(product_id = %id, "Marked product as merged");
        Ok(())
    }
}
