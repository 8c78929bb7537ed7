//! High-level storage operations.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use promo_models::{product_video_key, ProductId};

use crate::client::ObjectStore;
use crate::error::{StorageError, StorageResult};

/// Content type of every published video.
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Location of an uploaded product video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedVideo {
    pub key: String,
    pub url: String,
}

/// Upload a product's final video and return where it can be fetched.
///
/// The key embeds `at` (UTC) and a slug of `product_name`; metadata records
/// the product id and processing time.
pub async fn publish_product_video(
    store: &dyn ObjectStore,
    path: &Path,
    product_id: ProductId,
    product_name: &str,
    at: DateTime<Utc>,
) -> StorageResult<PublishedVideo> {
    if !tokio::fs::try_exists(path).await? {
        return Err(StorageError::upload_failed(format!(
            "file not found: {}",
            path.display()
        )));
    }

    let key = product_video_key(product_id.get(), product_name, &at);

    let mut metadata = HashMap::new();
    metadata.insert("product_id".to_string(), product_id.to_string());
    metadata.insert("processed_at".to_string(), at.to_rfc3339());

    store
        .put_file(path, &key, VIDEO_CONTENT_TYPE, &metadata)
        .await?;

    let url = store.public_url(&key);
    info!(product_id = %product_id, key = %key, "Published video: {}", url);

    Ok(PublishedVideo { key, url })
}
