//! Reconciliation data model.
//!
//! `Service`, `Dictionary` and `DictionaryItem` mirror the Fastly API
//! payloads. `DictionaryRecord` is the unit of work flowing from the
//! extractor to the verifier; `Verdict` is what a verification produces.

use crate::error::ActiveVersionError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One configuration version of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVersion {
    pub number: u32,
    #[serde(default)]
    pub active: bool,
}

/// Resolved configuration for one service identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub versions: Vec<ServiceVersion>,
}

impl Service {
    /// Number of the single version flagged active.
    ///
    /// Zero or several active versions is an inconsistent state and is
    /// reported as an error rather than resolved to a default.
    pub fn active_version(&self) -> Result<u32, ActiveVersionError> {
        let active: Vec<u32> = self
            .versions
            .iter()
            .filter(|v| v.active)
            .map(|v| v.number)
            .collect();

        match active.as_slice() {
            [] => Err(ActiveVersionError::NoneActive),
            [number] => Ok(*number),
            _ => Err(ActiveVersionError::Ambiguous(active)),
        }
    }
}

/// Edge dictionary attached to a service version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: String,
    pub name: String,
}

/// One key/value entry of an edge dictionary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryItem {
    pub item_key: String,
    pub item_value: String,
}

/// A hostname to site ID mapping as recorded by the CDN.
///
/// The owning service is shared, not copied, and is only used for
/// reporting. Records are immutable once built.
#[derive(Debug, Clone)]
pub struct DictionaryRecord {
    hostname: String,
    site_id: String,
    service: Arc<Service>,
}

impl DictionaryRecord {
    pub fn new(
        hostname: impl Into<String>,
        site_id: impl Into<String>,
        service: Arc<Service>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            site_id: site_id.into(),
            service,
        }
    }

    pub fn from_item(item: DictionaryItem, service: Arc<Service>) -> Self {
        Self::new(item.item_key, item.item_value, service)
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn service_name(&self) -> &str {
        &self.service.name
    }
}

/// A hostname whose dictionary site ID disagrees with policy docs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub service_name: String,
    pub hostname: String,
    pub stored_site_id: String,
    pub expected_site_id: String,
}

/// Outcome of checking one record against policy docs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch(Discrepancy),
    /// Lookup failed or the hostname has no policy doc
    Unverifiable(String),
}

impl Verdict {
    /// Compare a record's stored site ID with the expected one
    pub fn compare(record: &DictionaryRecord, expected_site_id: &str) -> Self {
        if record.site_id() == expected_site_id {
            Verdict::Match
        } else {
            Verdict::Mismatch(Discrepancy {
                service_name: record.service_name().to_string(),
                hostname: record.hostname().to_string(),
                stored_site_id: record.site_id().to_string(),
                expected_site_id: expected_site_id.to_string(),
            })
        }
    }
}
