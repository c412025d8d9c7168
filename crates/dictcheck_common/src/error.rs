//! Error types for dictcheck.

use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to the CDN configuration API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Failures looking up a hostname in policy docs.
///
/// A 404 is not an error; see `PolicyAnswer::NotFound` in the policy source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("{url} returned unexpected HTTP {status}")]
    UnexpectedStatus { status: u16, url: String },
}

/// The version list of a service does not have exactly one active entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActiveVersionError {
    #[error("no active version")]
    NoneActive,

    #[error("multiple active versions: {0:?}")]
    Ambiguous(Vec<u32>),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("FASTLY_API_KEY is not set")]
    MissingApiKey,

    #[error("No services configured")]
    NoServices,

    #[error("Dictionary name must not be empty")]
    EmptyDictionaryName,

    #[error("Service {0} is listed more than once")]
    DuplicateService(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
