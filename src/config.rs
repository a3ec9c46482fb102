//! Run configuration and input list loading.
//!
//! API settings come from CLI flags with environment fallbacks; venue and
//! keyword lists are plain text files with one entry per line.

use crate::error::{HarvestError, Result};
use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default Semantic Scholar Graph API base URL
pub const DEFAULT_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "SEMANTIC_SCHOLAR_API_KEY";

/// Environment variable overriding the API base URL
pub const API_BASE_ENV: &str = "SEMANTIC_SCHOLAR_API_BASE";

/// Connection settings for the Semantic Scholar API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Per-call HTTP timeout; none by default
    pub timeout: Option<Duration>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: None,
        }
    }
}

impl ApiConfig {
    /// Resolve settings, preferring explicit values over the environment.
    pub fn resolve(
        api_key: Option<String>,
        base_url: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|k| !k.trim().is_empty());
        let base_url = base_url
            .or_else(|| std::env::var(API_BASE_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Self {
            api_key,
            base_url,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Read one entry per line, trimming whitespace and skipping blank lines.
pub fn load_lines(path: &Path, lowercase: bool) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| if lowercase { l.to_lowercase() } else { l.to_string() })
        .collect())
}

/// Pick the venue list: the file wins over inline values, one of them is required.
pub fn resolve_venues(inline: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let venues = match file {
        Some(path) => load_lines(path, false)?,
        None if !inline.is_empty() => inline
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
        None => {
            return Err(HarvestError::Config(
                "Must supply --venues or --venues-file".to_string(),
            ))
        }
    };

    if venues.is_empty() {
        return Err(HarvestError::Config("Venue list is empty".to_string()));
    }
    Ok(venues)
}

/// Load lower-cased keywords; no file means no filtering.
pub fn load_keywords(file: Option<&PathBuf>) -> Result<Vec<String>> {
    match file {
        Some(path) => {
            let keywords = load_lines(path, true)?;
            info!(count = keywords.len(), path = %path.display(), "Loaded keywords");
            Ok(keywords)
        }
        None => Ok(Vec::new()),
    }
}

/// Warn about a year cutoff that can only match papers with unknown year.
pub fn check_year_from(year_from: i32) -> bool {
    let current = Local::now().year();
    if year_from > current {
        warn!(
            year_from,
            current_year = current,
            "Year cutoff lies in the future, only papers without a year will pass"
        );
        return false;
    }
    true
}
