//! Policy Source - expected site IDs from policy docs
//!
//! Policy docs serve one object per hostname. A hit carries the site ID in
//! the `x-goog-meta-pcontext-site-id` response header; a miss is a 404.

use async_trait::async_trait;
use dictcheck_common::PolicyError;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

/// Response header carrying the expected site ID
pub const SITE_ID_HEADER: &str = "x-goog-meta-pcontext-site-id";

/// What policy docs say about a hostname
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyAnswer {
    /// Site ID from the response header; empty when the header is absent.
    /// Non-UTF-8 bytes are replaced, never dropped.
    Found(String),
    NotFound,
}

#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn lookup(&self, hostname: &str) -> Result<PolicyAnswer, PolicyError>;
}

/// HTTP client for policy docs
#[derive(Debug, Clone)]
pub struct PolicyDocsClient {
    base_url: String,
    http: reqwest::Client,
}

impl PolicyDocsClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PolicyError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dictcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PolicyError::Http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url_for(&self, hostname: &str) -> String {
        format!("{}/{}", self.base_url, hostname)
    }
}

#[async_trait]
impl PolicySource for PolicyDocsClient {
    async fn lookup(&self, hostname: &str) -> Result<PolicyAnswer, PolicyError> {
        let url = self.url_for(hostname);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PolicyError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let site_id = response
                    .headers()
                    .get(SITE_ID_HEADER)
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .unwrap_or_default();
                Ok(PolicyAnswer::Found(site_id))
            }
            StatusCode::NOT_FOUND => Ok(PolicyAnswer::NotFound),
            status => Err(PolicyError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
