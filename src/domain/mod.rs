//! Domain types for manifest acquisition.
//!
//! This module contains the data that flows through the pipeline:
//! - Payload: raw manifest bytes, fulfillment errors, server diagnostics
//! - Manifest: the typed audiobook manifest shipped with the crate

pub mod manifest;
pub mod payload;

// Re-export commonly used types
pub use manifest::{AudioBookManifest, ManifestLink, ManifestMetadata};
pub use payload::{Credentials, FulfilledPayload, FulfillmentError, ProblemReport, ServerData};
