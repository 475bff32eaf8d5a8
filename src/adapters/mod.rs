//! Fulfillment strategies and the collaborators that plug into the pipeline.
//!
//! A fulfillment strategy performs the actual transfer of manifest bytes.
//! Strategies are created by factories, and factories are looked up by
//! [`Capability`] in a [`StrategyRegistry`] that the caller builds up front.

pub mod fallback;
pub mod http;
pub mod progress;
pub mod registry;
pub mod webpub;

use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::domain::{Credentials, FulfilledPayload, FulfillmentError};

pub use fallback::fallback_from_file;
pub use http::{BasicHttpFactory, BasicHttpStrategy};
pub use progress::{FulfillmentProgress, ProgressEvents, Subscription};
pub use registry::StrategyRegistry;
pub use webpub::WebPubManifestParser;

/// Kind of fulfillment a factory can perform
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Plain HTTP(S) fetch, optionally authenticated
    Basic,

    /// A caller-defined capability
    Custom(String),
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Everything a factory needs to build a strategy instance
#[derive(Debug, Clone)]
pub struct FulfillmentParameters {
    pub target_uri: Url,
    pub content_type: String,
    pub credentials: Option<Credentials>,

    /// Client identity sent with transport requests
    pub user_agent: String,

    /// Scratch space for any on-disk staging the strategy needs
    pub cache_directory: PathBuf,
}

/// Builds strategies for a single capability
pub trait FulfillmentStrategyFactory: Send + Sync {
    fn capability(&self) -> Capability;

    fn create(&self, parameters: FulfillmentParameters) -> Box<dyn FulfillmentStrategy>;
}

/// Performs one transfer of manifest bytes
pub trait FulfillmentStrategy: Send + Sync {
    /// Progress hub; subscribe before calling [`execute`](Self::execute)
    fn progress(&self) -> &ProgressEvents;

    /// Perform the transfer
    ///
    /// Blocks on I/O, so it must not run on an async executor thread.
    fn execute(&self) -> Result<FulfilledPayload, FulfillmentError>;
}
