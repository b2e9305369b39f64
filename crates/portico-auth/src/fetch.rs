// crates/portico-auth/src/fetch.rs
// ============================================================================
// Module: HTTP Fetcher Collaborator
// Description: Outbound GET seam for cert and introspection endpoints.
// Purpose: Let deployments map the logical fetch to their own HTTP stack.
// Dependencies: reqwest, std
// ============================================================================

//! ## Overview
//! The verification engine performs two kinds of outbound calls: fetching
//! an issuer's certificate set and introspecting an opaque access token.
//! Both go through this seam. The reference implementation uses a bounded
//! blocking client with redirects disabled; a fetch timeout surfaces as a
//! fetch error and the engine converts it into a verification failure, not
//! a distinct error class.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use thiserror::Error;

// ============================================================================
// SECTION: Fetch Interface
// ============================================================================

/// Errors raised by an HTTP fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built or did not complete.
    #[error("http request failed: {0}")]
    Request(String),
}

/// One fetched response.
///
/// # Invariants
/// - Header names are matched case-insensitively through [`Self::header`].
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code.
    pub status_code: u16,
    /// Response headers.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns a header value by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Outbound GET interface.
pub trait HttpFetcher: Send + Sync {
    /// Fetches `uri` and returns the full response.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the request does not complete.
    fn fetch(&self, uri: &str) -> Result<FetchResponse, FetchError>;
}

// ============================================================================
// SECTION: Reference Implementation
// ============================================================================

/// Default request timeout for the reference fetcher.
const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Blocking reqwest-backed fetcher with redirects disabled.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    /// Underlying HTTP client.
    client: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout_ms(DEFAULT_TIMEOUT_MS)
    }

    /// Creates a fetcher with an explicit timeout.
    ///
    /// # Errors
    /// Returns [`FetchError`] when the HTTP client cannot be built.
    pub fn with_timeout_ms(timeout_ms: u64) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(Policy::none())
            .build()
            .map_err(|_| FetchError::Request("http client build failed".to_string()))?;
        Ok(Self {
            client,
        })
    }
}

impl HttpFetcher for ReqwestFetcher {
    fn fetch(&self, uri: &str) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(uri)
            .send()
            .map_err(|err| FetchError::Request(err.to_string()))?;
        let status_code = response.status().as_u16();
        let mut headers = BTreeMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }
        let body = response
            .bytes()
            .map_err(|err| FetchError::Request(err.to_string()))?
            .to_vec();
        Ok(FetchResponse {
            status_code,
            headers,
            body,
        })
    }
}
