//! Codec for the self-describing image payload submitted with a reading.
//!
//! The wire shape is `data:image/{png|jpeg|jpg|gif};base64,{content}`. A
//! payload is accepted only if the tag names a supported type and the encoded
//! segment survives a decode→re-encode round trip (the corruption check).
//! Parsing has no side effects, so the lifecycle service can validate before
//! committing anything durable.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:image/";
const BASE64_MARKER: &str = ";base64,";

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("expected a data:image/...;base64,... payload")]
    MissingTag,

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("base64 content is corrupt or not canonically encoded")]
    CorruptContent,
}

/// Supported image types, as spelled in the payload tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Jpg,
    Gif,
}

impl ImageFormat {
    /// File extension used for the stored artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Jpg => "jpg",
            ImageFormat::Gif => "gif",
        }
    }

    /// MIME type sent to the recognition service.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg | ImageFormat::Jpg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = PayloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "png" => Ok(ImageFormat::Png),
            "jpeg" => Ok(ImageFormat::Jpeg),
            "jpg" => Ok(ImageFormat::Jpg),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(PayloadError::UnsupportedType(other.to_string())),
        }
    }
}

/// A decoded, validated image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ImagePayload {
    /// Decode and validate a tagged base64 payload.
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let tagged = raw
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or(PayloadError::MissingTag)?;
        let (tag, content) = tagged
            .split_once(BASE64_MARKER)
            .ok_or(PayloadError::MissingTag)?;

        let format: ImageFormat = tag.parse()?;

        let bytes = BASE64
            .decode(content)
            .map_err(|_| PayloadError::CorruptContent)?;

        // Round-trip check: the encoded segment must reproduce itself.
        if BASE64.encode(&bytes) != content {
            return Err(PayloadError::CorruptContent);
        }

        Ok(ImagePayload { bytes, format })
    }

    /// Canonical base64 of the image content, for the recognition call.
    pub fn base64_content(&self) -> String {
        BASE64.encode(&self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tagged(tag: &str, content: &str) -> String {
        format!("data:image/{tag};base64,{content}")
    }

    #[test]
    fn accepts_every_supported_type() {
        let content = BASE64.encode(b"not really an image");
        for tag in ["png", "jpeg", "jpg", "gif"] {
            let payload = ImagePayload::parse(&tagged(tag, &content)).unwrap();
            assert_eq!(payload.bytes, b"not really an image");
            assert_eq!(payload.format.extension(), tag);
        }
    }

    #[test]
    fn rejects_missing_or_malformed_tag() {
        let content = BASE64.encode(b"x");
        assert_eq!(
            ImagePayload::parse(&content),
            Err(PayloadError::MissingTag)
        );
        assert_eq!(
            ImagePayload::parse(&format!("data:image/png,{content}")),
            Err(PayloadError::MissingTag)
        );
        assert_eq!(
            ImagePayload::parse(&format!("data:text/plain;base64,{content}")),
            Err(PayloadError::MissingTag)
        );
    }

    #[test]
    fn rejects_unsupported_image_type() {
        let content = BASE64.encode(b"x");
        assert_eq!(
            ImagePayload::parse(&tagged("bmp", &content)),
            Err(PayloadError::UnsupportedType("bmp".into()))
        );
        assert_eq!(
            ImagePayload::parse(&tagged("webp", &content)),
            Err(PayloadError::UnsupportedType("webp".into()))
        );
    }

    #[test]
    fn rejects_corrupt_content() {
        assert_eq!(
            ImagePayload::parse(&tagged("png", "@@@not-base64@@@")),
            Err(PayloadError::CorruptContent)
        );
        // Valid alphabet but missing padding.
        assert_eq!(
            ImagePayload::parse(&tagged("png", "QUJDRA")),
            Err(PayloadError::CorruptContent)
        );
    }

    #[test]
    fn empty_content_is_a_valid_empty_image() {
        let payload = ImagePayload::parse("data:image/gif;base64,").unwrap();
        assert!(payload.bytes.is_empty());
    }

    #[test]
    fn jpg_and_jpeg_share_a_mime_type() {
        assert_eq!(ImageFormat::Jpg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
    }

    proptest! {
        /// Any correctly encoded byte sequence is accepted and decodes to
        /// the original bytes.
        #[test]
        fn well_formed_payloads_round_trip(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let raw = format!("data:image/png;base64,{}", BASE64.encode(&data));
            let payload = ImagePayload::parse(&raw).unwrap();
            prop_assert_eq!(payload.bytes, data);
        }

        /// Re-encoding a parsed payload reproduces the encoded segment.
        #[test]
        fn base64_content_matches_input(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let encoded = BASE64.encode(&data);
            let payload = ImagePayload::parse(&format!("data:image/jpeg;base64,{encoded}")).unwrap();
            prop_assert_eq!(payload.base64_content(), encoded);
        }
    }
}
