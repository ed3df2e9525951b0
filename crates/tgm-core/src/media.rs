//! Media classification (message payload → coarse [`MediaCategory`]).

use crate::domain::MediaCategory;

/// Transport-level kind of a message's media payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    /// Anything carried as a file with a declared content type.
    Document,
    /// Any other media the transport recognizes (location, poll, contact, ...).
    Other(String),
}

/// Media payload descriptor as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaDescriptor {
    pub kind: MediaKind,
    pub mime_type: Option<String>,
}

impl MediaDescriptor {
    pub fn photo() -> Self {
        Self {
            kind: MediaKind::Photo,
            mime_type: None,
        }
    }

    pub fn document(mime_type: Option<String>) -> Self {
        Self {
            kind: MediaKind::Document,
            mime_type,
        }
    }

    pub fn other(kind: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Other(kind.into()),
            mime_type: None,
        }
    }
}

/// Map a media payload to its category. Total: never fails.
pub fn classify(media: Option<&MediaDescriptor>) -> MediaCategory {
    let Some(media) = media else {
        return MediaCategory::Text;
    };

    match &media.kind {
        MediaKind::Photo => MediaCategory::Photo,
        MediaKind::Document => {
            let mime = media
                .mime_type
                .as_deref()
                .unwrap_or("")
                .trim()
                .to_ascii_lowercase();
            if mime.starts_with("video/") {
                MediaCategory::Video
            } else if mime.starts_with("audio/") {
                MediaCategory::Audio
            } else if mime.starts_with("image/") {
                MediaCategory::Image
            } else {
                MediaCategory::Document
            }
        }
        MediaKind::Other(_) => MediaCategory::Media,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_media_is_text() {
        assert_eq!(classify(None), MediaCategory::Text);
    }

    #[test]
    fn photo_is_photo() {
        assert_eq!(classify(Some(&MediaDescriptor::photo())), MediaCategory::Photo);
    }

    #[test]
    fn documents_split_by_mime_prefix() {
        let cases = [
            (Some("video/mp4"), MediaCategory::Video),
            (Some("audio/ogg"), MediaCategory::Audio),
            (Some("Image/WEBP"), MediaCategory::Image),
            (Some("application/pdf"), MediaCategory::Document),
            (Some(""), MediaCategory::Document),
            (None, MediaCategory::Document),
        ];
        for (mime, want) in cases {
            let d = MediaDescriptor::document(mime.map(str::to_string));
            assert_eq!(classify(Some(&d)), want, "mime {mime:?}");
        }
    }

    #[test]
    fn unknown_media_kind_is_catch_all() {
        assert_eq!(
            classify(Some(&MediaDescriptor::other("poll"))),
            MediaCategory::Media
        );
    }
}
