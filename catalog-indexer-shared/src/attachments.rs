//! Attachment selection rules.

use crate::source_item::Attachment;

/// Bundle holding the original uploaded binaries.
pub const ORIGINAL_BUNDLE: &str = "ORIGINAL";

/// Bundle holding generated preview images.
pub const THUMBNAIL_BUNDLE: &str = "THUMBNAIL";

/// MIME types treated as text-bearing when no configuration overrides them.
pub const DEFAULT_TEXT_BEARING_TYPES: &[&str] = &["application/pdf"];

/// The primary original binary: the first attachment in the `ORIGINAL` bundle
/// whose MIME type is one of `text_bearing_types`.
///
/// Only the first match is ever considered. Items with several text-bearing
/// originals are indexed and compared on that first one alone.
pub fn primary_attachment<'a, S: AsRef<str>>(
    attachments: &'a [Attachment],
    text_bearing_types: &[S],
) -> Option<&'a Attachment> {
    attachments.iter().find(|attachment| {
        attachment.is_in_bundle(ORIGINAL_BUNDLE)
            && attachment.mime_type.as_deref().is_some_and(|mime| {
                text_bearing_types
                    .iter()
                    .any(|wanted| wanted.as_ref().eq_ignore_ascii_case(mime))
            })
    })
}

/// The first image attachment in the `THUMBNAIL` bundle.
pub fn thumbnail_attachment(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments.iter().find(|attachment| {
        attachment.is_in_bundle(THUMBNAIL_BUNDLE)
            && attachment
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.to_ascii_lowercase().starts_with("image/"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source_item::Checksum;

    fn attachment(bundle: &str, mime: &str, checksum: &str) -> Attachment {
        Attachment {
            bundle_name: Some(bundle.to_string()),
            mime_type: Some(mime.to_string()),
            checksum: Some(Checksum {
                value: checksum.to_string(),
                algorithm: Some("MD5".to_string()),
            }),
            retrieve_link: Some(format!("/bitstreams/{}/retrieve", checksum)),
            ..Default::default()
        }
    }

    #[test]
    fn test_selects_pdf_and_thumbnail() {
        let attachments = vec![
            attachment("ORIGINAL", "application/pdf", "abc"),
            attachment("THUMBNAIL", "image/jpeg", "thumb"),
        ];

        let primary = primary_attachment(&attachments, DEFAULT_TEXT_BEARING_TYPES).unwrap();
        let thumbnail = thumbnail_attachment(&attachments).unwrap();

        assert_eq!(primary.checksum_value(), Some("abc"));
        assert_eq!(thumbnail.checksum_value(), Some("thumb"));
    }

    #[test]
    fn test_ignores_non_text_originals() {
        let attachments = vec![
            attachment("ORIGINAL", "image/png", "png"),
            attachment("LICENSE", "application/pdf", "license"),
        ];

        assert!(primary_attachment(&attachments, DEFAULT_TEXT_BEARING_TYPES).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let attachments = vec![
            attachment("ORIGINAL", "application/pdf", "first"),
            attachment("ORIGINAL", "application/pdf", "second"),
        ];

        let primary = primary_attachment(&attachments, DEFAULT_TEXT_BEARING_TYPES).unwrap();
        assert_eq!(primary.checksum_value(), Some("first"));
    }

    #[test]
    fn test_configured_types() {
        let attachments = vec![attachment(
            "ORIGINAL",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "docx",
        )];
        let types = vec![
            "application/pdf".to_string(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        ];

        assert!(primary_attachment(&attachments, &types).is_some());
    }

    #[test]
    fn test_empty_attachments() {
        assert!(primary_attachment(&[], DEFAULT_TEXT_BEARING_TYPES).is_none());
        assert!(thumbnail_attachment(&[]).is_none());
    }
}
