//! # s2harvest
//!
//! Venue-driven literature harvester for the Semantic Scholar Graph API.
//!
//! ## Modules
//!
//! - [`client`] - HTTP transport carrying the API key
//! - [`retry`] - Per-endpoint status semantics and bounded retry
//! - [`semanticscholar`] - Bulk search, forward citations, backward references
//! - [`keywords`] - Keyword relevance filter
//! - [`harvest`] - Venue, seed and citation orchestration and deduplication
//! - [`output`] - CSV persistence
//! - [`config`] - API settings and input lists
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use s2harvest::client::ApiClient;
//! use s2harvest::config::ApiConfig;
//! use s2harvest::harvest::{HarvestOptions, Harvester};
//! use s2harvest::keywords::KeywordFilter;
//! use s2harvest::retry::RetryPolicy;
//! use s2harvest::semanticscholar::SemanticScholar;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ApiConfig::default();
//!     let api = SemanticScholar::new(ApiClient::new(&config)?, &config.base_url, RetryPolicy::default())?;
//!     let harvester = Harvester::new(api, KeywordFilter::new(["graph"]), HarvestOptions::default());
//!     let rows = harvester.run(&["NeurIPS".to_string()]).await?.into_rows();
//!     println!("Harvested {} papers", rows.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod harvest;
pub mod keywords;
pub mod output;
pub mod record;
pub mod retry;
pub mod semanticscholar;

pub use error::{HarvestError, Result};
