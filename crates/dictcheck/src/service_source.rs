//! Service Source - CDN configuration lookups
//!
//! `ServiceSource` is the seam the pipeline talks to. `FastlyClient` is the
//! production implementation over the Fastly REST API; tests use
//! `crate::fakes::FakeServiceSource`.

use async_trait::async_trait;
use dictcheck_common::{Dictionary, DictionaryItem, Service, SourceError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Header Fastly reads the API token from
const API_KEY_HEADER: &str = "fastly-key";

#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// Fetch a service and its version list
    async fn get_service(&self, service_id: &str) -> Result<Service, SourceError>;

    /// Resolve a named dictionary on one version of a service
    async fn get_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, SourceError>;

    /// List every entry of a dictionary
    async fn list_dictionary_items(
        &self,
        service_id: &str,
        dictionary_id: &str,
    ) -> Result<Vec<DictionaryItem>, SourceError>;
}

/// Fastly API client
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct FastlyClient {
    base_url: String,
    http: reqwest::Client,
}

impl FastlyClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut token = HeaderValue::from_str(api_key)
            .map_err(|e| SourceError::Http(format!("invalid API key header: {}", e)))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, token);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dictcheck/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Http(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(url));
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::Decode(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl ServiceSource for FastlyClient {
    async fn get_service(&self, service_id: &str) -> Result<Service, SourceError> {
        self.get_json(&format!("/service/{}", service_id)).await
    }

    async fn get_dictionary(
        &self,
        service_id: &str,
        version: u32,
        name: &str,
    ) -> Result<Dictionary, SourceError> {
        self.get_json(&format!(
            "/service/{}/version/{}/dictionary/{}",
            service_id, version, name
        ))
        .await
    }

    async fn list_dictionary_items(
        &self,
        service_id: &str,
        dictionary_id: &str,
    ) -> Result<Vec<DictionaryItem>, SourceError> {
        self.get_json(&format!(
            "/service/{}/dictionary/{}/items",
            service_id, dictionary_id
        ))
        .await
    }
}
