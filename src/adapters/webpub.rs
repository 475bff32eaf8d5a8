//! Readium Web Publication manifest parser.

use crate::core::parser::ManifestParser;
use crate::domain::AudioBookManifest;

/// Content types this parser understands
pub const WEBPUB_CONTENT_TYPES: [&str; 3] = [
    "application/audiobook+json",
    "application/webpub+json",
    "application/json",
];

/// Parses audiobook manifests published as Readium WebPub JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct WebPubManifestParser;

impl WebPubManifestParser {
    pub fn accepts(content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or("").trim();
        WEBPUB_CONTENT_TYPES
            .iter()
            .any(|t| t.eq_ignore_ascii_case(essence))
    }
}

impl ManifestParser for WebPubManifestParser {
    type Manifest = AudioBookManifest;

    fn name(&self) -> &str {
        "webpub"
    }

    fn parse(&self, bytes: &[u8], content_type: &str) -> Result<AudioBookManifest, String> {
        if !Self::accepts(content_type) {
            return Err(format!("unsupported content type '{}'", content_type));
        }

        serde_json::from_slice(bytes).map_err(|e| format!("invalid manifest JSON: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_audiobook_json() {
        let bytes = br#"{
            "metadata": { "identifier": "urn:isbn:1", "title": "Flatland", "duration": 3600.0 },
            "readingOrder": [ { "href": "c1.mp3", "type": "audio/mpeg" } ]
        }"#;

        let manifest = WebPubManifestParser
            .parse(bytes, "application/audiobook+json; charset=utf-8")
            .unwrap();

        assert_eq!(manifest.metadata.title, "Flatland");
        assert_eq!(manifest.reading_order.len(), 1);
        assert_eq!(manifest.total_duration(), Some(3600.0));
    }

    #[test]
    fn test_rejects_foreign_content_type() {
        let reason = WebPubManifestParser
            .parse(b"{}", "application/epub+zip")
            .unwrap_err();
        assert_eq!(reason, "unsupported content type 'application/epub+zip'");
    }

    #[test]
    fn test_rejects_garbage() {
        let reason = WebPubManifestParser
            .parse(&[0u8; 23], "application/audiobook+json")
            .unwrap_err();
        assert!(reason.starts_with("invalid manifest JSON"));
    }
}
