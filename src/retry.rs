//! Bounded retry around one API request.
//!
//! Each endpoint decides what a status code means. The bulk search only
//! tolerates 200 and 429; the citation graph endpoints additionally retry
//! 500 and read 400 as "this paper has no such edges".

use crate::client::{ApiResponse, HttpTransport};
use crate::error::{HarvestError, Result};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default attempts per request
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Backoff used when a 429/500 carries no `Retry-After`
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Politeness delay between successful pages
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// API operations with distinct status semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    BulkSearch,
    Citations,
    References,
}

/// What a status code means for a given endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Backoff,
    DefinitiveEmpty,
    Fatal,
}

impl Endpoint {
    pub fn label(self) -> &'static str {
        match self {
            Endpoint::BulkSearch => "bulk search",
            Endpoint::Citations => "forward citations",
            Endpoint::References => "backward references",
        }
    }

    fn is_graph_edge(self) -> bool {
        matches!(self, Endpoint::Citations | Endpoint::References)
    }

    pub fn classify(self, status: u16) -> StatusClass {
        match status {
            200 => StatusClass::Success,
            429 => StatusClass::Backoff,
            500 if self.is_graph_edge() => StatusClass::Backoff,
            400 if self.is_graph_edge() => StatusClass::DefinitiveEmpty,
            _ => StatusClass::Fatal,
        }
    }
}

/// Retry ceiling and pacing
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub default_backoff: Duration,
    pub page_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            default_backoff: DEFAULT_BACKOFF,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Non-fatal outcome of a retried request
#[derive(Debug)]
pub enum Attempt {
    Success(ApiResponse),
    /// Upstream says there is nothing for this identifier
    DefinitiveEmpty,
    /// Every attempt was rate limited or hit a transient error
    Exhausted { attempts: u32 },
}

/// Send one request, retrying 429 (and 500 where tolerated) with
/// server-directed backoff. Params are resent unchanged on every attempt.
///
/// Statuses the endpoint does not tolerate are returned as
/// [`HarvestError::Api`] without further attempts.
pub async fn send_with_retry<T: HttpTransport + ?Sized>(
    transport: &T,
    endpoint: Endpoint,
    url: &Url,
    params: &[(&'static str, String)],
    policy: &RetryPolicy,
) -> Result<Attempt> {
    for attempt in 1..=policy.max_attempts {
        let response = transport.get(url, params).await?;
        let status = response.status;

        match endpoint.classify(status) {
            StatusClass::Success => {
                debug!(endpoint = endpoint.label(), attempt, "HTTP 200");
                return Ok(Attempt::Success(response));
            }
            StatusClass::DefinitiveEmpty => {
                info!(endpoint = endpoint.label(), url = %url, "HTTP 400, no results for this identifier");
                return Ok(Attempt::DefinitiveEmpty);
            }
            StatusClass::Backoff => {
                let wait = response.retry_after().unwrap_or(policy.default_backoff);
                warn!(
                    endpoint = endpoint.label(),
                    status,
                    attempt,
                    max_attempts = policy.max_attempts,
                    wait_secs = wait.as_secs(),
                    "Backing off"
                );
                tokio::time::sleep(wait).await;
            }
            StatusClass::Fatal => {
                return Err(HarvestError::Api {
                    code: i32::from(status),
                    message: format!("{} request to {} failed", endpoint.label(), url),
                });
            }
        }
    }

    Ok(Attempt::Exhausted {
        attempts: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use serde_json::{json, Value};
    use tokio::time::Instant;

    const PATH: &str = "/graph/v1/paper/p1/citations";

    fn url() -> Url {
        Url::parse(&format!("https://api.semanticscholar.org{}", PATH)).expect("static url")
    }

    #[test]
    fn test_status_semantics() {
        assert_eq!(Endpoint::BulkSearch.classify(200), StatusClass::Success);
        assert_eq!(Endpoint::BulkSearch.classify(429), StatusClass::Backoff);
        assert_eq!(Endpoint::BulkSearch.classify(500), StatusClass::Fatal);
        assert_eq!(Endpoint::BulkSearch.classify(400), StatusClass::Fatal);

        for endpoint in [Endpoint::Citations, Endpoint::References] {
            assert_eq!(endpoint.classify(429), StatusClass::Backoff);
            assert_eq!(endpoint.classify(500), StatusClass::Backoff);
            assert_eq!(endpoint.classify(400), StatusClass::DefinitiveEmpty);
            assert_eq!(endpoint.classify(404), StatusClass::Fatal);
            assert_eq!(endpoint.classify(503), StatusClass::Fatal);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_429_then_success_honors_retry_after() -> Result<()> {
        let transport = MockTransport::new();
        for secs in [2, 3, 4] {
            transport.push(PATH, ApiResponse::new(429, Value::Null).with_retry_after(secs));
        }
        transport.push(PATH, ApiResponse::new(200, json!({ "data": ["ok"] })));

        let params = vec![("offset", "0".to_string())];
        let started = Instant::now();
        let attempt = send_with_retry(
            &transport,
            Endpoint::Citations,
            &url(),
            &params,
            &RetryPolicy::default(),
        )
        .await?;

        match attempt {
            Attempt::Success(response) => assert_eq!(response.body, json!({ "data": ["ok"] })),
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(started.elapsed(), Duration::from_secs(9));

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|r| r.param("offset") == Some("0")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_retry_after_defaults_to_one_second() -> Result<()> {
        let transport = MockTransport::new();
        transport.push(PATH, ApiResponse::new(500, Value::Null));
        transport.push(PATH, ApiResponse::new(200, json!({ "data": [] })));

        let started = Instant::now();
        let attempt = send_with_retry(
            &transport,
            Endpoint::Citations,
            &url(),
            &[],
            &RetryPolicy::default(),
        )
        .await?;

        assert!(matches!(attempt, Attempt::Success(_)));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_not_an_error() -> Result<()> {
        let transport = MockTransport::new();
        for _ in 0..DEFAULT_MAX_ATTEMPTS {
            transport.push(PATH, ApiResponse::new(429, Value::Null));
        }

        let attempt = send_with_retry(
            &transport,
            Endpoint::BulkSearch,
            &url(),
            &[],
            &RetryPolicy::default(),
        )
        .await?;

        assert!(matches!(attempt, Attempt::Exhausted { attempts: 5 }));
        assert_eq!(transport.requests().len(), 5);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_400_is_definitive_empty_for_citations_only() -> Result<()> {
        let transport = MockTransport::new();
        transport.push(PATH, ApiResponse::new(400, Value::Null));
        let attempt = send_with_retry(
            &transport,
            Endpoint::Citations,
            &url(),
            &[],
            &RetryPolicy::default(),
        )
        .await?;
        assert!(matches!(attempt, Attempt::DefinitiveEmpty));

        transport.push(PATH, ApiResponse::new(400, Value::Null));
        let err = send_with_retry(
            &transport,
            Endpoint::BulkSearch,
            &url(),
            &[],
            &RetryPolicy::default(),
        )
        .await;
        assert!(matches!(err, Err(HarvestError::Api { code: 400, .. })));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_status_stops_immediately() {
        let transport = MockTransport::new();
        transport.push(PATH, ApiResponse::new(403, Value::Null));
        transport.push(PATH, ApiResponse::new(200, json!({ "data": [] })));

        let result = send_with_retry(
            &transport,
            Endpoint::References,
            &url(),
            &[],
            &RetryPolicy::default(),
        )
        .await;

        assert!(matches!(result, Err(HarvestError::Api { code: 403, .. })));
        assert_eq!(transport.requests().len(), 1);
    }
}
