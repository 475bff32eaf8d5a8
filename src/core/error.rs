//! Failure kinds recorded as step causes by the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::Capability;
use crate::domain::{FulfillmentError, ServerData};

use super::license::LicenseFailure;
use super::parser::ParseFailure;

/// Message recorded when the network is down and nothing can stand in for it
pub const NO_FALLBACK_MESSAGE: &str = "No fallback manifest data is provided";

/// Why a manifest acquisition failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AcquisitionError {
    #[error("No fallback manifest data is provided")]
    NetworkUnavailableNoFallback,

    /// The registry has no factory for the capability; an unsupported
    /// operation rather than a transient fault
    #[error("Unsupported operation: no fulfillment strategy is registered for capability '{capability}'")]
    StrategyNotFound { capability: Capability },

    #[error("{0}")]
    FulfillmentFailed(FulfillmentError),

    #[error("{0}")]
    ParseFailed(ParseFailure),

    #[error("{0}")]
    LicenseCheckFailed(LicenseFailure),
}

impl AcquisitionError {
    pub fn is_unsupported_operation(&self) -> bool {
        matches!(self, Self::StrategyNotFound { .. })
    }

    /// Structured server diagnostic, when the failure came from a server
    pub fn server_data(&self) -> Option<&ServerData> {
        match self {
            Self::FulfillmentFailed(error) => error.server_data.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fallback_message_matches_display() {
        assert_eq!(
            AcquisitionError::NetworkUnavailableNoFallback.to_string(),
            NO_FALLBACK_MESSAGE
        );
    }

    #[test]
    fn test_strategy_not_found_is_unsupported() {
        let error = AcquisitionError::StrategyNotFound {
            capability: Capability::Basic,
        };
        assert!(error.is_unsupported_operation());
        assert_eq!(
            error.to_string(),
            "Unsupported operation: no fulfillment strategy is registered for capability 'basic'"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let json = serde_json::to_value(AcquisitionError::StrategyNotFound {
            capability: Capability::Basic,
        })
        .unwrap();
        assert_eq!(json["kind"], "strategy_not_found");
        assert_eq!(json["capability"], "basic");
    }
}
