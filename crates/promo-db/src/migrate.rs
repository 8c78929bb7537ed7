//! Embedded schema migrations.

use sqlx::postgres::PgPool;
use sqlx::{Executor, Postgres};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};

/// One SQL migration shipped inside the binary.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Migrations in application order.
pub const MIGRATIONS: &[Migration] = &[Migration {
    name: "001_add_video_columns",
    sql: include_str!("../migrations/001_add_video_columns.sql"),
}];

/// Columns the worker reads or writes besides `id` and `video_data`.
pub const EXPECTED_COLUMNS: &[&str] = &["merge_status", "processed_at", "r2_video_url"];

/// Column description from `information_schema`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
}

/// Apply every migration, each in its own transaction.
///
/// Migrations are idempotent, so rerunning them is safe.
pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    for migration in MIGRATIONS {
        info!("Applying migration {}", migration.name);

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::migration(migration.name, e.to_string()))?;
        tx.commit().await?;

        info!("Migration {} applied", migration.name);
    }
    Ok(())
}

/// Look up [`EXPECTED_COLUMNS`] on `public.products`.
///
/// Fails when any of them is missing.
pub async fn verify_columns<'e, E>(executor: E) -> DbResult<Vec<ColumnInfo>>
where
    E: Executor<'e, Database = Postgres>,
{
    let names: Vec<String> = EXPECTED_COLUMNS.iter().map(|c| c.to_string()).collect();

    let columns: Vec<ColumnInfo> = sqlx::query_as(
        r#"
        SELECT column_name::text AS column_name,
               data_type::text AS data_type,
               is_nullable::text AS is_nullable
        FROM information_schema.columns
        WHERE table_schema = 'public'
          AND table_name = 'products'
          AND column_name = ANY($1)
        ORDER BY column_name
        "#,
    )
    .bind(&names)
    .fetch_all(executor)
    .await?;

    let missing = missing_columns(&columns);
    if !missing.is_empty() {
        warn!("Missing columns on public.products: {}", missing.join(", "));
        return Err(DbError::migration(
            "verify",
            format!("missing columns: {}", missing.join(", ")),
        ));
    }

    for column in &columns {
        info!(
            "  - {}: {} (nullable: {})",
            column.column_name, column.data_type, column.is_nullable
        );
    }
    Ok(columns)
}

fn missing_columns(found: &[ColumnInfo]) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !found.iter().any(|c| c.column_name == *name))
        .collect()
}
