//! Fake sources for deterministic testing
//!
//! `FakeServiceSource` and `FakePolicySource` answer from pre-configured
//! tables and record what they were asked, so pipeline behaviour can be
//! checked without any network calls.
//!
//! ```rust,ignore
//! let services = FakeServiceSource::new()
//!     .with_service("s1", "fe1", 3, &[("example.com", "site123")]);
//! let policy = FakePolicySource::new()
//!     .respond("example.com", FakePolicyResponse::site("site123"));
//! ```

use crate::policy_source::{PolicyAnswer, PolicySource};
use crate::service_source::ServiceSource;
use async_trait::async_trait;
use dictcheck_common::{
    Dictionary, DictionaryItem, PolicyError, Service, ServiceVersion, SourceError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// Fake Service Source
// ============================================================================

#[derive(Default)]
pub struct FakeServiceSource {
    services: HashMap<String, Service>,
    /// (service_id, version, dictionary name) -> dictionary
    dictionaries: HashMap<(String, u32, String), Dictionary>,
    /// dictionary_id -> entries
    items: HashMap<String, Vec<DictionaryItem>>,
    failing_listings: HashSet<String>,
    latency: Option<Duration>,
    fetched: Mutex<Vec<String>>,
    dictionary_lookups: Mutex<Vec<(String, u32, String)>>,
}

impl FakeServiceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service whose only version `active_version` is active, with a
    /// `hostname_to_site_id` dictionary holding `entries`
    pub fn with_service(
        self,
        id: &str,
        name: &str,
        active_version: u32,
        entries: &[(&str, &str)],
    ) -> Self {
        self.with_named_dictionary(id, name, active_version, "hostname_to_site_id", entries)
    }

    pub fn with_named_dictionary(
        mut self,
        id: &str,
        name: &str,
        active_version: u32,
        dictionary_name: &str,
        entries: &[(&str, &str)],
    ) -> Self {
        let mut versions: Vec<ServiceVersion> = (1..active_version)
            .map(|number| ServiceVersion {
                number,
                active: false,
            })
            .collect();
        versions.push(ServiceVersion {
            number: active_version,
            active: true,
        });

        self.services.insert(
            id.to_string(),
            Service {
                id: id.to_string(),
                name: name.to_string(),
                versions,
            },
        );

        let dictionary_id = format!("dict-{}", id);
        self.dictionaries.insert(
            (id.to_string(), active_version, dictionary_name.to_string()),
            Dictionary {
                id: dictionary_id.clone(),
                name: dictionary_name.to_string(),
            },
        );
        self.items.insert(
            dictionary_id,
            entries
                .iter()
                .map(|(key, value)| DictionaryItem {
                    item_key: key.to_string(),
                    item_value: value.to_string(),
                })
                .collect(),
        );
        self
    }

    /// Add a service as-is, with no dictionaries
    pub fn with_raw_service(mut self, service: Service) -> Self {
        self.services.insert(service.id.clone(), service);
        self
    }

    /// Make listing the dictionary of `service_id` fail
    pub fn failing_listing(mut self, service_id: &str) -> Self {
        self.failing_listings.insert(service_id.to_string());
        self
    }

    /// Delay every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Service IDs passed to `get_service`, in call order
    pub fn fetched_services(&self) -> Vec<String> {
        lock(&self.fetched).clone()
    }

    pub fn dictionary_lookups(&self) -> Vec<(String, u32, String)> {
        lock(&self.dictionary_lookups).clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ServiceSource for FakeServiceSource {
    async fn get_service(&self, service_id: &str) -> Result<Service, SourceError> {
        lock(&self.fetched).push(service_id.to_string());
        self.delay().await;

        self.services
            .get(service_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("service {}", service_id)))
    }

    async fn get_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, SourceError> {
        let key = (service_id.to_string(), version, name.to_string());
        lock(&self.dictionary_lookups).push(key.clone());
        self.delay().await;

        self.dictionaries.get(&key).cloned().ok_or_else(|| {
            SourceError::NotFound(format!(
                "dictionary {} on {} version {}",
                name, service_id, version
            ))
        })
    }

    async fn list_dictionary_items(
        &self,
        service_id: &str,
        dictionary_id: &str,
    ) -> Result<Vec<DictionaryItem>, SourceError> {
        self.delay().await;

        if self.failing_listings.contains(service_id) {
            return Err(SourceError::Status {
                status: 500,
                url: format!("/service/{}/dictionary/{}/items", service_id, dictionary_id),
            });
        }

        self.items
            .get(dictionary_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("dictionary {}", dictionary_id)))
    }
}

// ============================================================================
// Fake Policy Source
// ============================================================================

/// Pre-configured policy docs response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakePolicyResponse {
    Found(String),
    NotFound,
    Error(String),
}

impl FakePolicyResponse {
    pub fn site(site_id: &str) -> Self {
        FakePolicyResponse::Found(site_id.to_string())
    }

    pub fn error(message: &str) -> Self {
        FakePolicyResponse::Error(message.to_string())
    }
}

/// Hostnames without a configured response get a 404
#[derive(Default)]
pub struct FakePolicySource {
    responses: HashMap<String, FakePolicyResponse>,
    latency: Option<Duration>,
    lookups: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    completed: AtomicUsize,
}

impl FakePolicySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, hostname: &str, response: FakePolicyResponse) -> Self {
        self.responses.insert(hostname.to_string(), response);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Lookups started
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Lookups that ran to completion
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Highest number of lookups observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PolicySource for FakePolicySource {
    async fn lookup(&self, hostname: &str) -> Result<PolicyAnswer, PolicyError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);

        match self.responses.get(hostname) {
            Some(FakePolicyResponse::Found(site_id)) => Ok(PolicyAnswer::Found(site_id.clone())),
            Some(FakePolicyResponse::Error(message)) => Err(PolicyError::Http(message.clone())),
            Some(FakePolicyResponse::NotFound) | None => Ok(PolicyAnswer::NotFound),
        }
    }
}
