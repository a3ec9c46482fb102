//! HTTP client shared by every fetcher.
//!
//! The client does exactly one thing: send a GET with query parameters and
//! hand back the status, headers and decoded JSON body. It carries the
//! process-wide credential as a default header and contains no retry logic;
//! status semantics differ per endpoint and live in [`crate::retry`].

use crate::config::ApiConfig;
use crate::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// User agent sent with every request
const USER_AGENT: &str = concat!("s2harvest/", env!("CARGO_PKG_VERSION"));

/// Header carrying the Semantic Scholar API key
const API_KEY_HEADER: &str = "x-api-key";

/// Query parameters for a single request, in the order they are sent
pub type QueryParams = Vec<(&'static str, String)>;

/// Structured response handed to the fetchers
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Value,
}

impl ApiResponse {
    /// Build a response with no headers.
    pub fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Attach a `Retry-After` header (seconds).
    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.headers.insert(RETRY_AFTER, HeaderValue::from(secs));
        self
    }

    /// Server-directed backoff from `Retry-After`, if present and numeric.
    pub fn retry_after(&self) -> Option<Duration> {
        self.headers
            .get(RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }
}

/// The "send request, get response" seam used by all fetchers.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &Url, params: &[(&'static str, String)]) -> Result<ApiResponse>;
}

/// reqwest-backed transport with the credential baked into default headers
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Create a client from API configuration.
    ///
    /// The API key, when present, is sent as `x-api-key` on every request.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        match config.api_key.as_deref() {
            Some(key) => {
                let value = HeaderValue::from_str(key)
                    .map_err(|e| HarvestError::Config(format!("Invalid API key header: {}", e)))?;
                headers.insert(API_KEY_HEADER, value);
            }
            None => warn!("No Semantic Scholar API key configured, using the shared unauthenticated pool"),
        }

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| HarvestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ApiClient {
    async fn get(&self, url: &Url, params: &[(&'static str, String)]) -> Result<ApiResponse> {
        debug!(url = %url, params = ?params, "GET");

        let response = self.client.get(url.clone()).query(params).send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        let body = decode_body(status, &bytes)?;
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Decode a response body. Only a 200 is required to carry valid JSON.
fn decode_body(status: u16, bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return if status == 200 {
            Err(HarvestError::Parse("Empty body on HTTP 200".to_string()))
        } else {
            Ok(Value::Null)
        };
    }

    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(e) if status == 200 => Err(HarvestError::Parse(format!(
            "Failed to decode JSON response: {}",
            e
        ))),
        Err(_) => Ok(Value::Null),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_retry_after_parsing() {
        let response = ApiResponse::new(429, Value::Null).with_retry_after(7);
        assert_eq!(response.retry_after(), Some(Duration::from_secs(7)));

        let mut dated = ApiResponse::new(429, Value::Null);
        dated.headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(dated.retry_after(), None);

        assert_eq!(ApiResponse::new(429, Value::Null).retry_after(), None);
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(
            decode_body(200, br#"{"data": []}"#).expect("valid json"),
            json!({ "data": [] })
        );
        assert!(decode_body(200, b"<html>").is_err());
        assert!(decode_body(200, b"").is_err());
        assert_eq!(decode_body(429, b"Too Many Requests").expect("lenient"), Value::Null);
        assert_eq!(decode_body(400, b"  ").expect("lenient"), Value::Null);
    }

    #[test]
    fn test_client_rejects_invalid_key() {
        let config = ApiConfig {
            api_key: Some("bad\nkey".to_string()),
            ..ApiConfig::default()
        };
        assert!(matches!(ApiClient::new(&config), Err(HarvestError::Config(_))));
    }
}
