//! Manifest acquisition orchestrator.
//!
//! Sequences network gating, strategy lookup, fulfillment, parsing, and
//! license validation into one fail-fast procedure. Every phase is recorded
//! as a step; the first failed step ends the acquisition.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{Capability, FulfillmentParameters, FulfillmentProgress};
use crate::domain::{FulfilledPayload, FulfillmentError};

use super::error::{AcquisitionError, NO_FALLBACK_MESSAGE};
use super::recorder::{TaskRecorder, TaskResult};
use super::request::{AcquisitionRequest, ProgressSink};

/// Diagnostic attached to results built from fallback data
pub const FALLBACK_DIAGNOSTIC: &str = "The network is unavailable; fallback manifest data was used";

/// Where the manifest bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    Network,
    Fallback,
}

/// Successful acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult<M> {
    pub manifest: M,

    /// Content type the payload was declared with
    pub content_type: String,

    pub source: PayloadSource,

    /// Explains anything unusual about how the payload was obtained
    pub fulfillment_diagnostic: Option<FulfillmentError>,
}

/// Step log of an acquisition, with the result on success
pub type AcquisitionOutcome<M> = TaskResult<AcquisitionResult<M>, AcquisitionError>;

/// Payload obtained by the first phase
struct Fetched {
    payload: FulfilledPayload,
    source: PayloadSource,
    diagnostic: Option<FulfillmentError>,
}

/// Runs manifest acquisitions
#[derive(Debug, Clone)]
pub struct ManifestOrchestrator {
    /// Capability looked up in the request's strategy registry
    capability: Capability,
}

impl Default for ManifestOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestOrchestrator {
    /// An orchestrator that fulfills through the basic strategy
    pub fn new() -> Self {
        Self {
            capability: Capability::Basic,
        }
    }

    pub fn with_capability(capability: Capability) -> Self {
        Self { capability }
    }

    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Acquire, parse, and validate the manifest described by `request`
    ///
    /// Never fails outright: every failure is a step in the returned log.
    /// Blocks on network I/O, so run it off any async executor thread.
    #[instrument(
        skip(self, request),
        fields(acquisition_id = %Uuid::new_v4(), uri = %request.target_uri)
    )]
    pub fn orchestrate<M>(&self, request: &AcquisitionRequest<M>) -> AcquisitionOutcome<M> {
        info!("Starting manifest acquisition");
        let mut recorder = TaskRecorder::new();

        let fetched = if (request.is_network_available)() {
            self.fulfill(request, &mut recorder)
        } else {
            debug!("Network unavailable, using fallback path");
            self.load_fallback(request, &mut recorder)
        };
        let Some(fetched) = fetched else {
            return fail(recorder);
        };

        let Some(manifest) = parse(request, &fetched.payload, &mut recorder) else {
            return fail(recorder);
        };

        if !check_license(request, &manifest, &mut recorder) {
            return fail(recorder);
        }

        info!(source = ?fetched.source, "Manifest acquisition succeeded");
        recorder.finish_success(AcquisitionResult {
            manifest,
            content_type: fetched.payload.content_type,
            source: fetched.source,
            fulfillment_diagnostic: fetched.diagnostic,
        })
    }

    fn load_fallback<M>(
        &self,
        request: &AcquisitionRequest<M>,
        recorder: &mut TaskRecorder<AcquisitionError>,
    ) -> Option<Fetched> {
        recorder.begin_step("Loading fallback manifest data");
        recorder.add_attribute("Manifest URI", request.target_uri.as_str());

        let Some(supplier) = &request.fallback else {
            error!("Network unavailable and no fallback manifest data is provided");
            recorder.step_failed(
                NO_FALLBACK_MESSAGE,
                Some(AcquisitionError::NetworkUnavailableNoFallback),
            );
            return None;
        };

        match supplier() {
            Ok(payload) => {
                recorder.step_succeeded(format!(
                    "Loaded {} bytes of fallback manifest data",
                    payload.len()
                ));
                Some(Fetched {
                    payload,
                    source: PayloadSource::Fallback,
                    diagnostic: Some(FulfillmentError::new(FALLBACK_DIAGNOSTIC)),
                })
            }
            Err(e) => {
                error!(error = %e, "Fallback manifest data could not be loaded");
                recorder.step_failed(e.message.clone(), Some(AcquisitionError::FulfillmentFailed(e)));
                None
            }
        }
    }

    fn fulfill<M>(
        &self,
        request: &AcquisitionRequest<M>,
        recorder: &mut TaskRecorder<AcquisitionError>,
    ) -> Option<Fetched> {
        recorder.begin_step(format!(
            "Finding a fulfillment strategy for capability '{}'",
            self.capability
        ));

        let Some(factory) = request.strategy_registry.find_strategy(&self.capability) else {
            let e = AcquisitionError::StrategyNotFound {
                capability: self.capability.clone(),
            };
            error!(capability = %self.capability, "No fulfillment strategy registered");
            recorder.step_failed(e.to_string(), Some(e));
            return None;
        };
        recorder.step_succeeded("Found a fulfillment strategy");

        let strategy = factory.create(FulfillmentParameters {
            target_uri: request.target_uri.clone(),
            content_type: request.content_type.clone(),
            credentials: request.credentials.clone(),
            user_agent: request.user_agent.clone(),
            cache_directory: request.cache_directory.clone(),
        });

        recorder.begin_step(format!("Fulfilling manifest from {}", request.target_uri));
        recorder.add_attribute("Content type", request.content_type.as_str());
        recorder.add_attribute("User agent", request.user_agent.as_str());

        // Subscribe first so no progress emitted by execute() is missed.
        let subscription = strategy
            .progress()
            .subscribe(progress_observer(request.progress_sink.clone()));
        let result = strategy.execute();
        subscription.unsubscribe();

        match result {
            Ok(payload) => {
                recorder.step_succeeded(format!(
                    "Fulfilled manifest ({} bytes, {})",
                    payload.len(),
                    payload.content_type
                ));
                Some(Fetched {
                    payload,
                    source: PayloadSource::Network,
                    diagnostic: None,
                })
            }
            Err(e) => {
                error!(error = %e, "Manifest fulfillment failed");
                if let Some(server_data) = &e.server_data {
                    recorder.add_attribute("HTTP status", server_data.code.to_string());
                    recorder.add_attribute("Server URI", server_data.uri.as_str());
                }
                recorder.step_failed(e.message.clone(), Some(AcquisitionError::FulfillmentFailed(e)));
                None
            }
        }
    }
}

fn parse<M>(
    request: &AcquisitionRequest<M>,
    payload: &FulfilledPayload,
    recorder: &mut TaskRecorder<AcquisitionError>,
) -> Option<M> {
    recorder.begin_step("Parsing manifest");
    recorder.add_attribute("Content type", payload.content_type.as_str());

    match request.parsers.parse(&payload.bytes, &payload.content_type) {
        Ok(manifest) => {
            recorder.step_succeeded("Parsed manifest");
            Some(manifest)
        }
        Err(failure) => {
            error!(error = %failure, "Manifest parsing failed");
            recorder.step_failed(failure.to_string(), Some(AcquisitionError::ParseFailed(failure)));
            None
        }
    }
}

fn check_license<M>(
    request: &AcquisitionRequest<M>,
    manifest: &M,
    recorder: &mut TaskRecorder<AcquisitionError>,
) -> bool {
    recorder.begin_step("Checking manifest license");

    match request.license_checks.run(manifest) {
        Ok(()) if request.license_checks.is_empty() => {
            recorder.step_succeeded("No license checks are configured");
            true
        }
        Ok(()) => {
            recorder.step_succeeded(format!(
                "All {} license checks passed",
                request.license_checks.len()
            ));
            true
        }
        Err(failure) => {
            warn!(error = %failure, "Manifest license rejected");
            recorder.step_failed(
                failure.to_string(),
                Some(AcquisitionError::LicenseCheckFailed(failure)),
            );
            false
        }
    }
}

fn fail<M>(recorder: TaskRecorder<AcquisitionError>) -> AcquisitionOutcome<M> {
    info!(steps = recorder.len(), "Manifest acquisition failed");
    recorder.finish_failure()
}

/// Logs each progress event and forwards it to the caller's sink, if any
fn progress_observer(
    sink: Option<ProgressSink>,
) -> impl Fn(&FulfillmentProgress) + Send + Sync + 'static {
    move |event| {
        debug!(?event, "Fulfillment progress");
        if let Some(sink) = &sink {
            if sink.send(event.clone()).is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capability_is_basic() {
        let orchestrator = ManifestOrchestrator::new();
        assert_eq!(orchestrator.capability(), &Capability::Basic);
    }

    #[test]
    fn test_custom_capability() {
        let orchestrator =
            ManifestOrchestrator::with_capability(Capability::Custom("feedbooks".to_string()));
        assert_eq!(orchestrator.capability().to_string(), "feedbooks");
    }
}
