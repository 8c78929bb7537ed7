//! Shared data models for the product promo video worker.
//!
//! This crate provides Serde-serializable types for:
//! - Product records polled from the datastore
//! - The `video_data` document and its validation rules
//! - Encoding profiles for every transcode stage
//! - Object key and slug helpers

pub mod encoding;
pub mod product;
pub mod utils;

// Re-export common types
pub use encoding::{AudioNormalization, EncodingProfile, UpscaleTarget};
pub use product::{
    ProductId, ProductInfo, ProductRecord, ValidationError, VideoDataDocument, VideoEntry,
};
pub use utils::{product_video_key, slugify_name, KEY_TIMESTAMP_FORMAT, MAX_SLUG_LEN};
