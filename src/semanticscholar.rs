//! Semantic Scholar Graph API fetchers
//!
//! Three paginated operations share one page loop:
//! - Bulk venue search: `GET /paper/search/bulk`, continuation-token cursor
//! - Forward citations: `GET /paper/{id}/citations`, offset cursor
//! - Backward references: `GET /paper/{id}/references`, offset cursor
//!
//! Rows are filtered by year as they are parsed. Pages are paced with a
//! fixed politeness delay; 429/500 backoff is handled in [`crate::retry`].

use crate::client::{HttpTransport, QueryParams};
use crate::error::{HarvestError, Result};
use crate::record::{within_cutoff, PaperRecord};
use crate::retry::{send_with_retry, Attempt, Endpoint, RetryPolicy};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Fields requested from the bulk search
const BULK_FIELDS: &str = "paperId,title,abstract,year,venue,externalIds";

/// Fields requested for each citing paper
const CITATION_FIELDS: &str =
    "citingPaper.paperId,citingPaper.title,citingPaper.year,citingPaper.externalIds";

/// Fields requested for each referenced paper
const REFERENCE_FIELDS: &str =
    "citedPaper.paperId,citedPaper.title,citedPaper.year,citedPaper.externalIds";

/// Page size for citation and reference pages (API maximum)
pub const EDGE_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize)]
struct SSPaper {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    venue: Option<String>,
    #[serde(rename = "externalIds")]
    external_ids: Option<SSExternalIds>,
}

#[derive(Debug, Deserialize)]
struct SSExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkPage {
    #[serde(default)]
    data: Option<Vec<SSPaper>>,
    next: Option<Value>,
    token: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct EdgePage {
    #[serde(default)]
    data: Option<Vec<SSEdge>>,
}

#[derive(Debug, Deserialize)]
struct SSEdge {
    #[serde(rename = "citingPaper")]
    citing_paper: Option<SSPaper>,
    #[serde(rename = "citedPaper")]
    cited_paper: Option<SSPaper>,
}

impl SSPaper {
    /// Convert to a record; papers without an identifier are dropped.
    fn into_record(self) -> Option<PaperRecord> {
        let paper_id = self.paper_id.filter(|id| !id.is_empty())?;
        let (doi, arxiv) = self
            .external_ids
            .map(|ids| (ids.doi, ids.arxiv))
            .unwrap_or((None, None));

        Some(PaperRecord {
            paper_id,
            title: self.title.unwrap_or_default(),
            abstract_text: self.abstract_text.unwrap_or_default(),
            year: self.year,
            venue: self.venue.unwrap_or_default(),
            doi,
            arxiv,
            source: None,
            cited_by_empty: None,
        })
    }
}

/// Read the continuation cursor; `next` wins over `token`, empty means done.
fn continuation(next: Option<Value>, token: Option<Value>) -> Option<String> {
    [next, token].into_iter().flatten().find_map(|v| match v {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Pagination state
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Token(Option<String>),
    Offset(u32),
}

impl Cursor {
    fn start(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::BulkSearch => Cursor::Token(None),
            Endpoint::Citations | Endpoint::References => Cursor::Offset(0),
        }
    }

    fn apply(&self, params: &mut QueryParams) {
        match self {
            Cursor::Token(Some(token)) => params.push(("token", token.clone())),
            Cursor::Token(None) => {}
            Cursor::Offset(offset) => params.push(("offset", offset.to_string())),
        }
    }

    /// Next cursor, or `None` when the listing is finished.
    fn advance(&self, next_token: Option<String>) -> Option<Self> {
        match self {
            Cursor::Token(_) => next_token.map(|t| Cursor::Token(Some(t))),
            Cursor::Offset(offset) => Some(Cursor::Offset(offset + EDGE_PAGE_SIZE)),
        }
    }
}

/// One parsed page
struct Page {
    papers: Vec<SSPaper>,
    item_count: usize,
    next_token: Option<String>,
}

fn parse_page(endpoint: Endpoint, body: Value) -> Result<Page> {
    match endpoint {
        Endpoint::BulkSearch => {
            let page: BulkPage = serde_json::from_value(body).map_err(|e| {
                HarvestError::Parse(format!("Failed to parse bulk search page: {}", e))
            })?;
            let papers = page.data.unwrap_or_default();
            Ok(Page {
                item_count: papers.len(),
                next_token: continuation(page.next, page.token),
                papers,
            })
        }
        Endpoint::Citations | Endpoint::References => {
            let page: EdgePage = serde_json::from_value(body).map_err(|e| {
                HarvestError::Parse(format!("Failed to parse {} page: {}", endpoint.label(), e))
            })?;
            let edges = page.data.unwrap_or_default();
            let item_count = edges.len();
            let papers = edges
                .into_iter()
                .filter_map(|edge| match endpoint {
                    Endpoint::References => edge.cited_paper,
                    _ => edge.citing_paper,
                })
                .collect();
            Ok(Page {
                papers,
                item_count,
                next_token: None,
            })
        }
    }
}

/// Semantic Scholar fetcher over any transport
pub struct SemanticScholar<T> {
    transport: T,
    base_url: Url,
    policy: RetryPolicy,
}

impl<T: HttpTransport> SemanticScholar<T> {
    /// Create a fetcher rooted at `base_url` (e.g. `https://api.semanticscholar.org/graph/v1`).
    pub fn new(transport: T, base_url: &str, policy: RetryPolicy) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(HarvestError::Config(format!(
                "API base URL cannot carry a path: {}",
                base_url
            )));
        }
        Ok(Self {
            transport,
            base_url,
            policy,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Base URL extended with path segments, each escaped individually.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HarvestError::Config(format!("Invalid API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Enumerate every paper of a venue published in or after `year_from`.
    pub async fn search_venue_bulk(
        &self,
        venue: &str,
        year_from: i32,
        limit: u32,
    ) -> Result<Vec<PaperRecord>> {
        info!(venue, year_from, "Bulk-searching venue");
        let url = self.endpoint_url(&["paper", "search", "bulk"])?;
        let params: QueryParams = vec![
            ("query", String::new()),
            ("venue", venue.to_string()),
            ("year", format!("{}-", year_from)),
            ("fields", BULK_FIELDS.to_string()),
            ("limit", limit.to_string()),
        ];

        self.paginate(Endpoint::BulkSearch, venue, &url, params, year_from)
            .await
    }

    /// Papers that cite `paper_id`.
    pub async fn forward_citations(&self, paper_id: &str, year_from: i32) -> Result<Vec<PaperRecord>> {
        info!(paper_id, year_from, "Fetching forward citations");
        let url = self.endpoint_url(&["paper", paper_id, "citations"])?;
        let params: QueryParams = vec![
            ("fields", CITATION_FIELDS.to_string()),
            ("limit", EDGE_PAGE_SIZE.to_string()),
        ];

        self.paginate(Endpoint::Citations, paper_id, &url, params, year_from)
            .await
    }

    /// Papers referenced by `paper_id` (its bibliography).
    pub async fn backward_references(
        &self,
        paper_id: &str,
        year_from: i32,
    ) -> Result<Vec<PaperRecord>> {
        info!(paper_id, year_from, "Fetching backward references");
        let url = self.endpoint_url(&["paper", paper_id, "references"])?;
        let params: QueryParams = vec![
            ("fields", REFERENCE_FIELDS.to_string()),
            ("limit", EDGE_PAGE_SIZE.to_string()),
        ];

        self.paginate(Endpoint::References, paper_id, &url, params, year_from)
            .await
    }

    /// Shared page loop.
    ///
    /// Stops on an empty page, a missing continuation token (bulk search),
    /// a definitive-empty answer, or retry exhaustion. The last two return
    /// whatever rows were collected so far.
    async fn paginate(
        &self,
        endpoint: Endpoint,
        subject: &str,
        url: &Url,
        base_params: QueryParams,
        year_from: i32,
    ) -> Result<Vec<PaperRecord>> {
        let mut rows = Vec::new();
        let mut cursor = Cursor::start(endpoint);

        loop {
            let mut params = base_params.clone();
            cursor.apply(&mut params);

            let response = match send_with_retry(&self.transport, endpoint, url, &params, &self.policy).await? {
                Attempt::Success(response) => response,
                Attempt::DefinitiveEmpty => {
                    info!(endpoint = endpoint.label(), subject, collected = rows.len(), "No results for identifier");
                    return Ok(rows);
                }
                Attempt::Exhausted { attempts } => {
                    warn!(
                        endpoint = endpoint.label(),
                        subject,
                        attempts,
                        collected = rows.len(),
                        "Giving up after repeated retries, keeping partial results"
                    );
                    return Ok(rows);
                }
            };

            let page = parse_page(endpoint, response.body)?;
            if page.item_count == 0 {
                debug!(endpoint = endpoint.label(), subject, cursor = ?cursor, "Empty page, end of results");
                break;
            }

            let before = rows.len();
            for paper in page.papers {
                match paper.into_record() {
                    Some(record) if within_cutoff(record.year, year_from) => rows.push(record),
                    Some(_) => {}
                    None => debug!(endpoint = endpoint.label(), subject, "Skipping item without paperId"),
                }
            }

            info!(
                endpoint = endpoint.label(),
                subject,
                items = page.item_count,
                kept = rows.len() - before,
                total = rows.len(),
                "Fetched page"
            );

            match cursor.advance(page.next_token) {
                Some(next) => cursor = next,
                None => break,
            }
            tokio::time::sleep(self.policy.page_delay).await;
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::ApiResponse;
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::Instant;

    const BASE: &str = "https://api.semanticscholar.org/graph/v1";
    const BULK: &str = "/graph/v1/paper/search/bulk";
    const CITATIONS: &str = "/graph/v1/paper/seed1/citations";
    const REFERENCES: &str = "/graph/v1/paper/seed1/references";

    fn fetcher() -> Result<SemanticScholar<MockTransport>> {
        SemanticScholar::new(MockTransport::new(), BASE, RetryPolicy::default())
    }

    fn citing(id: &str, title: &str, year: Option<i32>) -> Value {
        json!({ "citingPaper": { "paperId": id, "title": title, "year": year } })
    }

    #[test]
    fn test_continuation() {
        assert_eq!(continuation(Some(json!("abc")), None), Some("abc".to_string()));
        assert_eq!(continuation(None, Some(json!("tok"))), Some("tok".to_string()));
        assert_eq!(continuation(Some(json!("")), Some(json!("tok"))), Some("tok".to_string()));
        assert_eq!(continuation(Some(json!(1000)), None), Some("1000".to_string()));
        assert_eq!(continuation(Some(Value::Null), None), None);
        assert_eq!(continuation(None, None), None);
    }

    #[test]
    fn test_endpoint_url_escapes_identifier() -> Result<()> {
        let api = fetcher()?;
        let url = api.endpoint_url(&["paper", "DOI:10.1/x", "citations"])?;
        assert_eq!(url.path(), "/graph/v1/paper/DOI:10.1%2Fx/citations");

        let trailing = SemanticScholar::new(MockTransport::new(), "http://localhost/api/", RetryPolicy::default())?;
        assert_eq!(trailing.endpoint_url(&["paper", "search", "bulk"])?.path(), "/api/paper/search/bulk");
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_search_follows_token_until_absent() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(
            BULK,
            ApiResponse::new(200, json!({
                "total": 3,
                "token": "page2",
                "data": [
                    { "paperId": "a", "title": "A", "year": 2021, "venue": "V",
                      "externalIds": { "DOI": "10.1/a", "ArXiv": "2101.00001" } },
                    { "paperId": "b", "title": "B", "year": 2019 }
                ]
            })),
        );
        api.transport().push(
            BULK,
            ApiResponse::new(200, json!({
                "data": [ { "paperId": "c", "title": "C", "year": null, "abstract": "text" } ]
            })),
        );

        let started = Instant::now();
        let rows = api.search_venue_bulk("V", 2020, 4000).await?;

        let ids: Vec<&str> = rows.iter().map(|r| r.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(rows[0].doi.as_deref(), Some("10.1/a"));
        assert_eq!(rows[0].arxiv.as_deref(), Some("2101.00001"));
        assert_eq!(rows[1].abstract_text, "text");
        assert_eq!(rows[1].year, None);

        let requests = api.transport().requests_to(BULK);
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].param("token"), None);
        assert_eq!(requests[0].param("venue"), Some("V"));
        assert_eq!(requests[0].param("year"), Some("2020-"));
        assert_eq!(requests[0].param("limit"), Some("4000"));
        assert_eq!(requests[0].param("query"), Some(""));
        assert_eq!(requests[1].param("token"), Some("page2"));

        // one politeness delay between the two pages
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_bulk_search_fatal_status_propagates() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(BULK, ApiResponse::new(500, Value::Null));

        let result = api.search_venue_bulk("V", 2020, 100).await;
        assert!(matches!(result, Err(HarvestError::Api { code: 500, .. })));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_citations_paginate_by_offset_until_empty_page() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(
            CITATIONS,
            ApiResponse::new(200, json!({
                "offset": 0,
                "next": 1000,
                "data": [
                    citing("c1", "Graph one", Some(2022)),
                    citing("c2", "Too old", Some(2001)),
                    { "citingPaper": null },
                    { "citingPaper": { "paperId": null, "title": "Not in corpus" } }
                ]
            })),
        );
        api.transport().push(
            CITATIONS,
            ApiResponse::new(200, json!({ "data": [ citing("c3", "No year", None) ] })),
        );
        api.transport().push(CITATIONS, ApiResponse::new(200, json!({ "data": [] })));

        let rows = api.forward_citations("seed1", 2020).await?;
        let ids: Vec<&str> = rows.iter().map(|r| r.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let offsets: Vec<String> = api
            .transport()
            .requests_to(CITATIONS)
            .iter()
            .filter_map(|r| r.param("offset").map(str::to_string))
            .collect();
        assert_eq!(offsets, vec!["0", "1000", "2000"]);
        assert!(api
            .transport()
            .requests_to(CITATIONS)
            .iter()
            .all(|r| r.param("limit") == Some("1000")));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_citations_400_on_first_page_is_empty() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(CITATIONS, ApiResponse::new(400, json!({ "error": "bad id" })));

        let rows = api.forward_citations("seed1", 2005).await?;
        assert!(rows.is_empty());
        assert_eq!(api.transport().requests().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_citations_keep_partial_rows_on_exhaustion() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(
            CITATIONS,
            ApiResponse::new(200, json!({ "data": [ citing("c1", "kept", Some(2021)) ] })),
        );
        for _ in 0..5 {
            api.transport().push(CITATIONS, ApiResponse::new(429, Value::Null).with_retry_after(2));
        }

        let started = Instant::now();
        let rows = api.forward_citations("seed1", 2005).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].paper_id, "c1");
        // page delay + five backoffs
        assert_eq!(started.elapsed(), Duration::from_secs(1 + 5 * 2));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_references_extract_cited_paper() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(
            REFERENCES,
            ApiResponse::new(200, json!({
                "data": [
                    { "citedPaper": { "paperId": "r1", "title": "Ref", "year": 2010,
                                      "externalIds": { "DOI": "10.9/r1" } } }
                ]
            })),
        );

        let rows = api.backward_references("seed1", 2005).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].paper_id, "r1");
        assert_eq!(rows[0].doi.as_deref(), Some("10.9/r1"));

        let first = &api.transport().requests_to(REFERENCES)[0];
        assert_eq!(first.param("fields"), Some(REFERENCE_FIELDS));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_null_data_ends_pagination() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(
            CITATIONS,
            ApiResponse::new(200, json!({ "data": [ citing("c1", "kept", Some(2021)) ] })),
        );
        api.transport().push(CITATIONS, ApiResponse::new(200, json!({ "offset": 1000, "data": null })));

        let rows = api.forward_citations("seed1", 2005).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].paper_id, "c1");
        assert_eq!(api.transport().requests_to(CITATIONS).len(), 2);

        api.transport().push(
            BULK,
            ApiResponse::new(200, json!({ "total": 0, "token": "unused", "data": null })),
        );
        let rows = api.search_venue_bulk("V", 2005, 100).await?;
        assert!(rows.is_empty());
        assert_eq!(api.transport().requests_to(BULK).len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_page_is_parse_error() -> Result<()> {
        let api = fetcher()?;
        api.transport().push(CITATIONS, ApiResponse::new(200, json!({ "data": "nope" })));

        let result = api.forward_citations("seed1", 2005).await;
        assert!(matches!(result, Err(HarvestError::Parse(_))));
        Ok(())
    }
}
