//! Inputs for a single manifest acquisition.

use std::fmt;
use std::path::PathBuf;

use reqwest::Url;
use tokio::sync::mpsc::UnboundedSender;

use crate::adapters::{FulfillmentProgress, StrategyRegistry};
use crate::domain::{Credentials, FulfilledPayload, FulfillmentError};

use super::license::{LicenseCheck, LicenseCheckChain};
use super::parser::{ManifestParser, ParserChain};

/// Decides between live fulfillment and the fallback path
pub type NetworkPredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// Produces manifest bytes without touching the network
pub type FallbackSupplier =
    Box<dyn Fn() -> Result<FulfilledPayload, FulfillmentError> + Send + Sync>;

/// Caller-owned channel that receives fulfillment progress
pub type ProgressSink = UnboundedSender<FulfillmentProgress>;

/// Client identity used when the caller does not supply one
pub const DEFAULT_USER_AGENT: &str = concat!("audiobook-manifest/", env!("CARGO_PKG_VERSION"));

/// Everything one acquisition needs
///
/// Only the target URI and content type are required. Everything else
/// defaults to a no-op: an empty registry, no fallback, no parsers, no
/// license checks, and a network that is assumed available.
pub struct AcquisitionRequest<M> {
    pub target_uri: Url,
    pub content_type: String,

    /// Client identity forwarded to the fulfillment strategy
    pub user_agent: String,

    /// Forwarded unmodified; `None` means an anonymous fetch
    pub credentials: Option<Credentials>,

    pub strategy_registry: StrategyRegistry,
    pub is_network_available: NetworkPredicate,
    pub fallback: Option<FallbackSupplier>,
    pub parsers: ParserChain<M>,
    pub license_checks: LicenseCheckChain<M>,

    /// Scratch space handed to the fulfillment strategy
    pub cache_directory: PathBuf,

    pub progress_sink: Option<ProgressSink>,
}

impl<M> AcquisitionRequest<M> {
    pub fn new(target_uri: Url, content_type: impl Into<String>) -> Self {
        Self {
            target_uri,
            content_type: content_type.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            credentials: None,
            strategy_registry: StrategyRegistry::new(),
            is_network_available: Box::new(|| true),
            fallback: None,
            parsers: ParserChain::new(),
            license_checks: LicenseCheckChain::new(),
            cache_directory: std::env::temp_dir().join("audiobook-manifest"),
            progress_sink: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_strategy_registry(mut self, registry: StrategyRegistry) -> Self {
        self.strategy_registry = registry;
        self
    }

    pub fn with_network_available<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_network_available = Box::new(predicate);
        self
    }

    pub fn with_fallback<F>(mut self, supplier: F) -> Self
    where
        F: Fn() -> Result<FulfilledPayload, FulfillmentError> + Send + Sync + 'static,
    {
        self.fallback = Some(Box::new(supplier));
        self
    }

    pub fn with_parser<P>(mut self, parser: P) -> Self
    where
        P: ManifestParser<Manifest = M> + 'static,
    {
        self.parsers.push(parser);
        self
    }

    pub fn with_license_check<C>(mut self, check: C) -> Self
    where
        C: LicenseCheck<M> + 'static,
    {
        self.license_checks.push(check);
        self
    }

    pub fn with_cache_directory(mut self, cache_directory: impl Into<PathBuf>) -> Self {
        self.cache_directory = cache_directory.into();
        self
    }

    pub fn with_progress_sink(mut self, sink: ProgressSink) -> Self {
        self.progress_sink = Some(sink);
        self
    }
}

impl<M> fmt::Debug for AcquisitionRequest<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionRequest")
            .field("target_uri", &self.target_uri.as_str())
            .field("content_type", &self.content_type)
            .field("user_agent", &self.user_agent)
            .field("credentials", &self.credentials)
            .field("strategy_registry", &self.strategy_registry)
            .field("fallback", &self.fallback.is_some())
            .field("parsers", &self.parsers)
            .field("license_checks", &self.license_checks)
            .field("cache_directory", &self.cache_directory)
            .finish()
    }
}
