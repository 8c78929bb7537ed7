//! Product queries.
//!
//! All functions use the generic Executor pattern, so they work with both
//! `&PgPool` and `&mut PgConnection`.

use sqlx::{Executor, Postgres};

use promo_models::ProductRecord;

/// Row shape of the pending-products query.
#[derive(Debug, sqlx::FromRow)]
pub struct PendingProductRow {
    pub id: i64,
    pub video_data: Option<serde_json::Value>,
}

impl From<PendingProductRow> for ProductRecord {
    fn from(row: PendingProductRow) -> Self {
        ProductRecord::new(row.id, row.video_data)
    }
}

/// Products that still need a merged video, in id order.
pub async fn fetch_pending_products<'e, E>(executor: E) -> Result<Vec<PendingProductRow>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id::bigint AS id, video_data::jsonb AS video_data
        FROM public.products
        WHERE merge_status = FALSE
          AND video_data IS NOT NULL
          AND video_data::text != 'null'
        ORDER BY id
        "#,
    )
    .fetch_all(executor)
    .await
}

/// Record the published URL and flip the merge flag.
///
/// Returns the number of rows updated.
pub async fn mark_product_done<'e, E>(executor: E, id: i64, url: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE public.products
        SET merge_status = TRUE, r2_video_url = $1, processed_at = NOW()
        WHERE id = $2
        "#,
    )
    .bind(url)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
