//! Naming helpers for published objects.

use chrono::{DateTime, TimeZone};

/// Timestamp layout used as the object key prefix.
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Maximum number of characters kept from the product name.
pub const MAX_SLUG_LEN: usize = 50;

/// Prefix under which merged videos are stored.
const KEY_PREFIX: &str = "merged_videos";

/// Turn a product name into a key-safe slug.
///
/// ASCII letters, digits, `-` and `_` are kept; every other character
/// becomes `_`. The result is cut to [`MAX_SLUG_LEN`] characters and
/// stripped of leading and trailing `_`. Falls back to `product` when
/// nothing is left.
pub fn slugify_name(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SLUG_LEN)
        .collect();

    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug.to_string()
    }
}

/// Object key for a product's final video.
///
/// `merged_videos/<YYYYmmdd_HHMMSS>_product_<id>_<slug>.mp4`
pub fn product_video_key<Tz>(product_id: i64, name: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}/{}_product_{}_{}.mp4",
        KEY_PREFIX,
        at.format(KEY_TIMESTAMP_FORMAT),
        product_id,
        slugify_name(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_slugify_vietnamese_name() {
        assert_eq!(slugify_name("Áo Thun Nam"), "o_Thun_Nam");
    }

    #[test]
    fn test_slugify_keeps_dash_and_underscore() {
        assert_eq!(slugify_name("T-shirt_XL (2 pack)"), "T-shirt_XL__2_pack");
    }

    #[test]
    fn test_slugify_truncates() {
        let name = "a".repeat(80);
        assert_eq!(slugify_name(&name).chars().count(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_slugify_empty_fallback() {
        assert_eq!(slugify_name(""), "product");
        assert_eq!(slugify_name("Ầ Ở"), "product");
    }

    #[test]
    fn test_product_video_key() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            product_video_key(42, "Áo Thun Nam", &at),
            "merged_videos/20250101_120000_product_42_o_Thun_Nam.mp4"
        );
    }
}
