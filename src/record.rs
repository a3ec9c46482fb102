//! Paper rows produced by the harvester.

use std::fmt;

/// Canonical columns, in output order, before the provenance columns
pub const CANONICAL_COLUMNS: [&str; 7] =
    ["paper_id", "title", "abstract", "year", "venue", "doi", "arxiv"];

/// Where a row came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    /// Direct hit from a venue bulk search
    Venue(String),
    /// Paper citing the given seed
    CitedBy(String),
    /// Paper referenced by the given seed
    References(String),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Venue(name) => write!(f, "venue:{}", name),
            Source::CitedBy(id) => write!(f, "cited_by:{}", id),
            Source::References(id) => write!(f, "references:{}", id),
        }
    }
}

/// One harvested paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperRecord {
    pub paper_id: String,
    pub title: String,
    pub abstract_text: String,
    pub year: Option<i32>,
    pub venue: String,
    pub doi: Option<String>,
    pub arxiv: Option<String>,
    pub source: Option<Source>,
    /// Set only on a seed that had zero forward citations
    pub cited_by_empty: Option<bool>,
}

impl PaperRecord {
    /// Minimal record with only an identifier.
    pub fn new(paper_id: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: String::new(),
            abstract_text: String::new(),
            year: None,
            venue: String::new(),
            doi: None,
            arxiv: None,
            source: None,
            cited_by_empty: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_year(mut self, year: Option<i32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Copy of this row flagged as a seed without citing papers.
    pub fn marked_cited_by_empty(&self) -> Self {
        let mut copy = self.clone();
        copy.cited_by_empty = Some(true);
        copy
    }

    /// Field values as written to the output table, in column order.
    ///
    /// Missing values become empty strings.
    pub fn field_values(&self) -> Vec<String> {
        vec![
            self.paper_id.clone(),
            self.title.clone(),
            self.abstract_text.clone(),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.venue.clone(),
            self.doi.clone().unwrap_or_default(),
            self.arxiv.clone().unwrap_or_default(),
            self.source.as_ref().map(|s| s.to_string()).unwrap_or_default(),
            self.cited_by_empty.map(|f| f.to_string()).unwrap_or_default(),
        ]
    }
}

/// A year passes when unknown or at/after the cutoff.
pub fn within_cutoff(year: Option<i32>, year_from: i32) -> bool {
    year.map_or(true, |y| y >= year_from)
}

/// Tag every row of a batch with the same provenance.
pub fn tag_all(rows: Vec<PaperRecord>, source: &Source) -> Vec<PaperRecord> {
    rows.into_iter()
        .map(|r| r.with_source(source.clone()))
        .collect()
}
