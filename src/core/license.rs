//! License checks run against a parsed manifest.
//!
//! Unlike the parser chain, every configured check runs so that all failure
//! reasons end up in the report. Any failure fails the whole chain.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::AudioBookManifest;

/// Leading text of every license failure message
pub const LICENSE_FAILURE_PREFIX: &str = "One or more license checks failed";

/// Result of a single license check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCheckOutcome {
    pub passed: bool,
    pub message: Option<String>,
}

impl LicenseCheckOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
        }
    }
}

/// A rule asserting that a manifest is usable under current entitlements
pub trait LicenseCheck<M>: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, manifest: &M) -> LicenseCheckOutcome;
}

/// A failed check and its reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCheckFailure {
    pub check: String,
    pub reason: String,
}

/// One or more checks failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseFailure {
    pub failures: Vec<LicenseCheckFailure>,
}

impl fmt::Display for LicenseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", LICENSE_FAILURE_PREFIX)?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.check, failure.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for LicenseFailure {}

/// Ordered list of license checks for manifests of type `M`
pub struct LicenseCheckChain<M> {
    checks: Vec<Box<dyn LicenseCheck<M>>>,
}

impl<M> Default for LicenseCheckChain<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> LicenseCheckChain<M> {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn with<C>(mut self, check: C) -> Self
    where
        C: LicenseCheck<M> + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    pub fn push<C>(&mut self, check: C)
    where
        C: LicenseCheck<M> + 'static,
    {
        self.checks.push(Box::new(check));
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run every check; an empty chain passes
    pub fn run(&self, manifest: &M) -> Result<(), LicenseFailure> {
        let mut failures = Vec::new();

        for check in &self.checks {
            let outcome = check.check(manifest);
            if outcome.passed {
                debug!(check = check.name(), "License check passed");
                continue;
            }

            let reason = outcome
                .message
                .unwrap_or_else(|| "check failed without a reason".to_string());
            warn!(check = check.name(), %reason, "License check failed");
            failures.push(LicenseCheckFailure {
                check: check.name().to_string(),
                reason,
            });
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LicenseFailure { failures })
        }
    }
}

impl<M> fmt::Debug for LicenseCheckChain<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LicenseCheckChain")
            .field("checks", &self.names())
            .finish()
    }
}

/// Fails manifests whose `expires` instant has passed
#[derive(Debug, Clone, Default)]
pub struct ExpirationCheck {
    /// Fixed evaluation instant; the current time when unset
    now: Option<DateTime<Utc>>,
}

impl ExpirationCheck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate expiry as of `now` instead of the wall clock
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }
}

impl LicenseCheck<AudioBookManifest> for ExpirationCheck {
    fn name(&self) -> &str {
        "expiration"
    }

    fn check(&self, manifest: &AudioBookManifest) -> LicenseCheckOutcome {
        let now = self.now.unwrap_or_else(Utc::now);
        match manifest.metadata.expires {
            Some(expires) if expires <= now => LicenseCheckOutcome::fail(format!(
                "The license for this book expired at {}",
                expires.to_rfc3339()
            )),
            _ => LicenseCheckOutcome::pass(),
        }
    }
}

/// Fails manifests with nothing to play
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingOrderCheck;

impl LicenseCheck<AudioBookManifest> for ReadingOrderCheck {
    fn name(&self) -> &str {
        "reading_order"
    }

    fn check(&self, manifest: &AudioBookManifest) -> LicenseCheckOutcome {
        if manifest.reading_order.is_empty() {
            LicenseCheckOutcome::fail("The manifest does not contain any playable chapters")
        } else {
            LicenseCheckOutcome::pass()
        }
    }
}
