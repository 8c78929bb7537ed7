//! Postgres persistence for the promo worker.
//!
//! Queries are plain functions generic over [`sqlx::Executor`] so they run
//! against a pool or inside a transaction. [`PgProductStore`] wraps them
//! behind the [`ProductStore`] capability the worker depends on.

pub mod error;
pub mod migrate;
pub mod products;
pub mod store;

pub use error::{DbError, DbResult};
pub use migrate::{run_migrations, verify_columns, ColumnInfo, Migration, EXPECTED_COLUMNS, MIGRATIONS};
pub use products::{fetch_pending_products, mark_product_done, PendingProductRow};
pub use store::{PgProductStore, ProductStore, DEFAULT_MAX_CONNECTIONS};
