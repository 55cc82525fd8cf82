//! Image data URIs — the form screenshots and crops travel in over messages.

use base64::{engine::general_purpose::STANDARD, Engine};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::SnipError;

/// Base64 payloads shorter than this cannot hold a real image.
pub const MIN_PAYLOAD_CHARS: usize = 100;

static IMAGE_DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/(?:png|jpeg|webp));base64,([A-Za-z0-9+/]+={0,2})$").unwrap()
});

/// A decoded image data URI.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

pub fn encode_png(bytes: &[u8]) -> String {
    encode("image/png", bytes)
}

/// Checks shape and size, then decodes.
///
/// Fails with `InvalidImageData` for anything that is not a base64 image
/// data URI carrying at least `MIN_PAYLOAD_CHARS` of payload.
pub fn decode(uri: &str) -> Result<ImagePayload, SnipError> {
    let caps = IMAGE_DATA_URI.captures(uri.trim()).ok_or_else(|| {
        SnipError::InvalidImageData("expected a base64 image data URI".to_string())
    })?;

    let mime = caps[1].to_string();
    let payload = &caps[2];
    if payload.len() < MIN_PAYLOAD_CHARS {
        return Err(SnipError::InvalidImageData(format!(
            "payload too small ({} chars)",
            payload.len()
        )));
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| SnipError::InvalidImageData(e.to_string()))?;

    Ok(ImagePayload { mime, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_what_it_encodes() {
        let bytes: Vec<u8> = (0..=255).collect();
        let uri = encode_png(&bytes);
        assert!(uri.starts_with("data:image/png;base64,"));
        let payload = decode(&uri).unwrap();
        assert_eq!(payload.mime, "image/png");
        assert_eq!(payload.bytes, bytes);
        assert_eq!(payload.extension(), "png");
    }

    #[test]
    fn rejects_non_image_uris() {
        for bad in [
            "",
            "hello",
            "data:text/plain;base64,aGVsbG8=",
            "data:image/gif;base64,R0lGODlh",
            "data:image/png,raw",
        ] {
            assert!(
                matches!(decode(bad), Err(SnipError::InvalidImageData(_))),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn rejects_trivial_payload() {
        let err = decode("data:image/png;base64,iVBORw0KGgo=").unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn jpeg_extension() {
        let uri = encode("image/jpeg", &[0xFF; 128]);
        assert_eq!(decode(&uri).unwrap().extension(), "jpg");
    }
}
