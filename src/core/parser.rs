//! Manifest parser chain.
//!
//! Parsers are tried in the order they were configured and the first one to
//! accept the payload wins. When every parser rejects it, the chain reports
//! a single [`ParseFailure`] that lists each parser's reason.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Leading text of every parse failure message
pub const PARSE_FAILURE_PREFIX: &str = "Manifest parsing failed";

/// Decodes raw manifest bytes into a typed manifest
pub trait ManifestParser: Send + Sync {
    type Manifest;

    /// Short name used in failure reports
    fn name(&self) -> &str;

    /// Parse `bytes` declared as `content_type`, or explain why not
    fn parse(&self, bytes: &[u8], content_type: &str) -> Result<Self::Manifest, String>;
}

/// One parser's reason for rejecting a payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserRejection {
    pub parser: String,
    pub reason: String,
}

/// No configured parser accepted the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub rejections: Vec<ParserRejection>,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rejections.is_empty() {
            return write!(f, "{}: no manifest parsers are configured", PARSE_FAILURE_PREFIX);
        }

        write!(f, "{}: ", PARSE_FAILURE_PREFIX)?;
        for (i, rejection) in self.rejections.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", rejection.parser, rejection.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseFailure {}

/// Ordered set of parsers for manifests of type `M`
pub struct ParserChain<M> {
    parsers: Vec<Box<dyn ManifestParser<Manifest = M>>>,
}

impl<M> Default for ParserChain<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ParserChain<M> {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Append a parser; it is tried after every parser added before it
    pub fn with<P>(mut self, parser: P) -> Self
    where
        P: ManifestParser<Manifest = M> + 'static,
    {
        self.parsers.push(Box::new(parser));
        self
    }

    pub fn push<P>(&mut self, parser: P)
    where
        P: ManifestParser<Manifest = M> + 'static,
    {
        self.parsers.push(Box::new(parser));
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.parsers.iter().map(|p| p.name()).collect()
    }

    pub fn parse(&self, bytes: &[u8], content_type: &str) -> Result<M, ParseFailure> {
        let mut rejections = Vec::new();

        for parser in &self.parsers {
            match parser.parse(bytes, content_type) {
                Ok(manifest) => {
                    debug!(parser = parser.name(), "Manifest accepted");
                    return Ok(manifest);
                }
                Err(reason) => {
                    debug!(parser = parser.name(), %reason, "Manifest rejected");
                    rejections.push(ParserRejection {
                        parser: parser.name().to_string(),
                        reason,
                    });
                }
            }
        }

        Err(ParseFailure { rejections })
    }
}

impl<M> fmt::Debug for ParserChain<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserChain")
            .field("parsers", &self.names())
            .finish()
    }
}
