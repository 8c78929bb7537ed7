//! Cloudflare R2 storage for published promo videos.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability used by the worker
//! - An R2 implementation on top of the S3 API
//! - Product video publishing (key naming, metadata, public URL)

pub mod client;
pub mod error;
pub mod operations;

pub use client::{ObjectStore, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use operations::{publish_product_video, PublishedVideo, VIDEO_CONTENT_TYPE};
