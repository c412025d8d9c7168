//! dictcheck common types
//!
//! Data model, error types and configuration shared by the reconciliation
//! pipeline and its sources.

pub mod config;
pub mod error;
pub mod model;

pub use config::{Config, ServiceTarget};
pub use error::{ActiveVersionError, ConfigError, PolicyError, SourceError};
pub use model::{
    Dictionary, DictionaryItem, DictionaryRecord, Discrepancy, Service, ServiceVersion, Verdict,
};
