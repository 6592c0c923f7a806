//! Storage key generation.
//!
//! Published objects live under `uploads/{uuid}-{stem}.{ext}` where the
//! extension always matches the final storage encoding, regardless of what
//! the caller named the file.

use pixvet_core::format::FormatTag;
use uuid::Uuid;

const MAX_STEM_LEN: usize = 64;

/// Reduce a caller-supplied filename to a safe key fragment: path
/// components dropped, anything outside `[A-Za-z0-9._-]` replaced.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches(['.', '-']).to_string();
    if trimmed.is_empty() {
        "image".to_string()
    } else {
        trimmed
    }
}

/// Build the permanent storage key for an upload. The original extension is
/// discarded and rewritten to match `format`.
pub fn publish_key(filename: &str, format: FormatTag) -> String {
    let sanitized = sanitize_filename(filename);
    let stem = match sanitized.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => sanitized.as_str(),
    };
    let stem: String = stem.chars().take(MAX_STEM_LEN).collect();

    format!("uploads/{}-{}.{}", Uuid::new_v4(), stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_filename("holiday_photo-1.jpg"), "holiday_photo-1.jpg");
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my-photo--1-.png");
    }

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cat.png"), "cat.png");
    }

    #[test]
    fn test_sanitize_empty_falls_back() {
        assert_eq!(sanitize_filename(""), "image");
        assert_eq!(sanitize_filename("///"), "image");
    }

    #[test]
    fn test_publish_key_rewrites_extension() {
        let key = publish_key("photo.jpg", FormatTag::WebP);
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-photo.webp"), "got {key}");
        assert!(!key.contains(".jpg"));
    }

    #[test]
    fn test_publish_key_handles_missing_extension() {
        let key = publish_key("photo", FormatTag::WebP);
        assert!(key.ends_with("-photo.webp"));
    }

    #[test]
    fn test_publish_keys_are_unique() {
        let a = publish_key("photo.png", FormatTag::WebP);
        let b = publish_key("photo.png", FormatTag::WebP);
        assert_ne!(a, b);
    }
}
