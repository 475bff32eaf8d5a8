//! audiobook-manifest - Audiobook manifest acquisition pipeline
//!
//! Fetches a remote audiobook manifest (or substitutes local fallback data),
//! parses it, runs license checks, and reports the outcome as an ordered
//! step log rather than a single pass/fail flag.
//!
//! # Architecture
//!
//! Every collaborator is an explicit part of the request:
//! - Fulfillment strategies are looked up by capability in a registry
//! - Parsers form an ordered chain; the first to accept wins
//! - License checks all run; any failure fails the acquisition
//! - The orchestrator records each phase and stops at the first failure
//!
//! # Modules
//!
//! - `adapters`: Fulfillment strategies, progress events, bundled parser
//! - `core`: Step recorder, chains, request, orchestrator
//! - `domain`: Data structures (payloads, errors, manifest)
//! - `config`: Configuration file and environment resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch and validate a manifest
//! abm fetch https://example.com/book/manifest.json
//!
//! # Use a local copy when offline
//! abm fetch https://example.com/book/manifest.json --offline --fallback manifest.json
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{Capability, FulfillmentProgress, StrategyRegistry, WebPubManifestParser};
pub use crate::core::{
    AcquisitionError, AcquisitionOutcome, AcquisitionRequest, AcquisitionResult,
    ManifestOrchestrator, TaskResult,
};
pub use domain::{AudioBookManifest, Credentials, FulfilledPayload, FulfillmentError};
