//! Book cover references: either a download URL or an inline base64 image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    None,
    Url(String),
    Inline(Vec<u8>),
}

impl ImageRef {
    /// Classify a stored reference. Undecodable inline data is treated as absent.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.is_empty() {
            return ImageRef::None;
        }
        if is_url(reference) {
            return ImageRef::Url(reference.to_string());
        }

        let compact: String = reference.chars().filter(|c| !c.is_whitespace()).collect();
        match STANDARD.decode(compact.as_bytes()) {
            Ok(bytes) if !bytes.is_empty() => ImageRef::Inline(bytes),
            Ok(_) => ImageRef::None,
            Err(err) => {
                tracing::debug!(error = %err, "image reference is neither URL nor base64");
                ImageRef::None
            }
        }
    }
}

fn is_url(reference: &str) -> bool {
    ["http://", "https://", "memory://", "gs://"]
        .iter()
        .any(|scheme| reference.starts_with(scheme))
}

/// Encode raw image bytes as an inline reference.
pub fn encode_inline(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Sniff a content type from the image magic bytes.
pub fn content_type(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_references() {
        assert_eq!(ImageRef::parse(""), ImageRef::None);
        assert_eq!(
            ImageRef::parse("https://cdn.example.com/a.jpg"),
            ImageRef::Url("https://cdn.example.com/a.jpg".into())
        );
        assert_eq!(ImageRef::parse("not base64!"), ImageRef::None);
    }

    #[test]
    fn inline_tolerates_line_breaks() {
        let bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4, 5, 6, 7, 8];
        let encoded = encode_inline(&bytes);
        let wrapped = format!("{}\n{}", &encoded[..8], &encoded[8..]);

        assert_eq!(ImageRef::parse(&wrapped), ImageRef::Inline(bytes.clone()));
        assert_eq!(content_type(&bytes), "image/jpeg");
    }
}
