//! Typed audiobook manifest.
//!
//! Models the subset of the Readium Web Publication manifest that audiobook
//! distributors publish: metadata, a reading order of audio resources, and
//! auxiliary links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A parsed audiobook manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioBookManifest {
    pub metadata: ManifestMetadata,

    /// Audio resources in playback order
    #[serde(default)]
    pub reading_order: Vec<ManifestLink>,

    #[serde(default)]
    pub links: Vec<ManifestLink>,
}

impl AudioBookManifest {
    /// Total duration in seconds, summed over the reading order when the
    /// metadata does not declare one
    pub fn total_duration(&self) -> Option<f64> {
        if self.metadata.duration.is_some() {
            return self.metadata.duration;
        }

        self.reading_order
            .iter()
            .map(|link| link.duration)
            .sum::<Option<f64>>()
    }

    /// Find a link by relation
    pub fn link(&self, rel: &str) -> Option<&ManifestLink> {
        self.links.iter().find(|l| l.rel.as_deref() == Some(rel))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    pub identifier: String,

    pub title: String,

    #[serde(default)]
    pub language: Option<String>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Instant after which the distributor no longer licenses playback
    #[serde(default)]
    pub expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestLink {
    pub href: String,

    #[serde(rename = "type", default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub rel: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}
