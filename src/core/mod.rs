//! Core acquisition logic.
//!
//! This module contains:
//! - Recorder: Ordered step log and sealed task results
//! - Parser: Pluggable manifest parser chain
//! - License: Pluggable license check chain
//! - Request: Inputs for one acquisition
//! - Orchestrator: The fail-fast acquisition pipeline

pub mod error;
pub mod license;
pub mod orchestrator;
pub mod parser;
pub mod recorder;
pub mod request;

// Re-export commonly used types
pub use error::{AcquisitionError, NO_FALLBACK_MESSAGE};
pub use license::{
    ExpirationCheck, LicenseCheck, LicenseCheckChain, LicenseCheckFailure, LicenseCheckOutcome,
    LicenseFailure, ReadingOrderCheck, LICENSE_FAILURE_PREFIX,
};
pub use orchestrator::{
    AcquisitionOutcome, AcquisitionResult, ManifestOrchestrator, PayloadSource,
    FALLBACK_DIAGNOSTIC,
};
pub use parser::{ManifestParser, ParseFailure, ParserChain, ParserRejection, PARSE_FAILURE_PREFIX};
pub use recorder::{StepResolution, TaskRecorder, TaskResult, TaskStep};
pub use request::{
    AcquisitionRequest, FallbackSupplier, NetworkPredicate, ProgressSink, DEFAULT_USER_AGENT,
};
