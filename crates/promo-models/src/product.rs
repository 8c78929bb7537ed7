//! Product records and the `video_data` document.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Primary key of a row in `public.products`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl ProductId {
    /// Get the raw integer id.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Reasons a `video_data` payload is not eligible for processing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("video_data is NULL")]
    Null,

    #[error("video_data is not a JSON object")]
    NotAnObject,

    #[error("video_data has no videos")]
    NoVideos,

    #[error("video_data.videos is not an array")]
    VideosNotArray,

    #[error("video {index} has no url")]
    MissingUrl { index: usize },

    #[error("video_data is malformed: {0}")]
    Malformed(String),
}

/// A pending row as read from the datastore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    /// Raw payload; `None` when the column is SQL NULL.
    pub video_data: Option<Value>,
}

impl ProductRecord {
    pub fn new(id: impl Into<ProductId>, video_data: Option<Value>) -> Self {
        Self {
            id: id.into(),
            video_data,
        }
    }

    /// Record-level eligibility check performed by the poll loop.
    ///
    /// Only looks at the outer shape (non-null object with a non-empty
    /// `videos` array). Per-entry checks are left to
    /// [`VideoDataDocument::from_value`].
    pub fn check_shape(&self) -> Result<&Value, ValidationError> {
        let value = match &self.video_data {
            None | Some(Value::Null) => return Err(ValidationError::Null),
            Some(v) => v,
        };
        let object = value.as_object().ok_or(ValidationError::NotAnObject)?;
        match object.get("videos") {
            None | Some(Value::Null) => Err(ValidationError::NoVideos),
            Some(Value::Array(videos)) if videos.is_empty() => Err(ValidationError::NoVideos),
            Some(Value::Array(_)) => Ok(value),
            Some(_) => Err(ValidationError::VideosNotArray),
        }
    }
}

/// `productInfo` block of the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    #[serde(default)]
    pub name: Option<String>,
}

/// One source clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub url: String,
}

/// Parsed `video_data` document.
///
/// `videos` order is the concatenation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDataDocument {
    #[serde(default)]
    pub product_info: ProductInfo,
    pub videos: Vec<VideoEntry>,
}

impl VideoDataDocument {
    /// Validate and parse a raw payload.
    ///
    /// Every video entry must be an object carrying a non-empty string `url`.
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let object = match value {
            Value::Null => return Err(ValidationError::Null),
            Value::Object(map) => map,
            _ => return Err(ValidationError::NotAnObject),
        };

        let videos = match object.get("videos") {
            None | Some(Value::Null) => return Err(ValidationError::NoVideos),
            Some(Value::Array(videos)) => videos,
            Some(_) => return Err(ValidationError::VideosNotArray),
        };
        if videos.is_empty() {
            return Err(ValidationError::NoVideos);
        }

        for (index, entry) in videos.iter().enumerate() {
            let has_url = entry
                .get("url")
                .and_then(Value::as_str)
                .is_some_and(|url| !url.trim().is_empty());
            if !has_url {
                return Err(ValidationError::MissingUrl { index });
            }
        }

        serde_json::from_value(value.clone())
            .map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Product name, if present and non-blank.
    pub fn product_name(&self) -> Option<&str> {
        self.product_info
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Source clip URLs in concatenation order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.videos.iter().map(|v| v.url.trim())
    }
}
