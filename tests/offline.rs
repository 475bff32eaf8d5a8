//! Offline Acquisition Integration Tests
//!
//! Exercises the bundled collaborators end to end: a fallback file on disk,
//! the WebPub parser, and the built-in license checks.

use audiobook_manifest::adapters::{fallback_from_file, StrategyRegistry, WebPubManifestParser};
use audiobook_manifest::core::{
    AcquisitionRequest, ExpirationCheck, ManifestOrchestrator, ReadingOrderCheck,
};
use audiobook_manifest::domain::AudioBookManifest;
use chrono::{TimeZone, Utc};
use reqwest::Url;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

const CONTENT_TYPE: &str = "application/audiobook+json";

const MANIFEST: &str = r#"{
    "metadata": {
        "identifier": "urn:isbn:9780486272634",
        "title": "Flatland",
        "expires": "2030-01-01T00:00:00Z"
    },
    "readingOrder": [
        { "href": "https://example.com/flatland/01.mp3", "type": "audio/mpeg", "duration": 1500.0 },
        { "href": "https://example.com/flatland/02.mp3", "type": "audio/mpeg", "duration": 1320.0 }
    ]
}"#;

fn offline_request(temp: &TempDir, contents: &str) -> AcquisitionRequest<AudioBookManifest> {
    let path = temp.path().join("manifest.json");
    std::fs::write(&path, contents).unwrap();

    AcquisitionRequest::new(
        Url::parse("https://example.com/flatland/manifest.json").unwrap(),
        CONTENT_TYPE,
    )
    .with_strategy_registry(StrategyRegistry::with_defaults())
    .with_network_available(|| false)
    .with_fallback(fallback_from_file(path, CONTENT_TYPE))
    .with_parser(WebPubManifestParser)
    .with_cache_directory(temp.path().join("cache"))
}

#[test]
fn test_fallback_manifest_is_parsed_and_checked() {
    let temp = TempDir::new().unwrap();
    let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let request = offline_request(&temp, MANIFEST)
        .with_license_check(ExpirationCheck::at(now))
        .with_license_check(ReadingOrderCheck);

    let outcome = ManifestOrchestrator::new().orchestrate(&request);

    let result = outcome.into_value().expect("acquisition should succeed");
    assert_eq!(result.manifest.metadata.title, "Flatland");
    assert_eq!(result.manifest.reading_order.len(), 2);
    assert_eq!(result.manifest.total_duration(), Some(2820.0));
}

#[test]
fn test_expired_fallback_manifest_is_rejected() {
    let temp = TempDir::new().unwrap();
    let after_expiry = Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap();
    let request = offline_request(&temp, MANIFEST).with_license_check(ExpirationCheck::at(after_expiry));

    let outcome = ManifestOrchestrator::new().orchestrate(&request);

    assert!(outcome.is_failure());
    assert_eq!(outcome.steps().len(), 3);
    let message = outcome.resolution_of(2).message();
    assert!(message.starts_with("One or more license checks failed"));
    assert!(message.contains("expiration: The license for this book expired at 2030-01-01T00:00:00+00:00"));
}

#[test]
fn test_malformed_fallback_manifest_is_rejected() {
    let temp = TempDir::new().unwrap();
    let request = offline_request(&temp, "{ not json");

    let outcome = ManifestOrchestrator::new().orchestrate(&request);

    assert!(outcome.is_failure());
    let message = outcome.resolution_of(1).message();
    assert!(message.starts_with("Manifest parsing failed: webpub: invalid manifest JSON"));
}

#[test]
fn test_support_report_for_failed_acquisition() {
    let temp = TempDir::new().unwrap();
    let request = offline_request(&temp, "{ not json");

    let outcome = ManifestOrchestrator::new().orchestrate(&request);
    let report = outcome.support_report();

    assert!(report.starts_with("Outcome: Failed\n"));
    assert!(report.contains("Step 1: Loading fallback manifest data\n"));
    assert!(report.contains("  Manifest URI: https://example.com/flatland/manifest.json\n"));
    assert!(report.contains("Step 2: Parsing manifest\n"));
    assert!(report.contains("  Failed: Manifest parsing failed"));
    assert!(!report.contains("Step 3"));
}

#[test]
fn test_fallback_supplier_reads_current_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("manifest.json");
    let supplier = fallback_from_file(&path, CONTENT_TYPE);

    assert_err!(supplier());

    std::fs::write(&path, MANIFEST).unwrap();
    let payload = assert_ok!(supplier());
    assert_eq!(payload.bytes, MANIFEST.as_bytes());
}
