//! Row-level keyword relevance filter.
//!
//! A row passes when any keyword is a substring of its lower-cased field
//! values joined by spaces. An empty keyword set lets everything through.

use crate::record::PaperRecord;

#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Build a filter; keywords are trimmed and lower-cased, blanks dropped.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn matches(&self, record: &PaperRecord) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let blob = search_blob(record);
        self.keywords.iter().any(|k| blob.contains(k.as_str()))
    }

    /// Keep matching rows, preserving order.
    pub fn retain(&self, rows: Vec<PaperRecord>) -> Vec<PaperRecord> {
        if self.keywords.is_empty() {
            return rows;
        }
        rows.into_iter().filter(|r| self.matches(r)).collect()
    }
}

fn search_blob(record: &PaperRecord) -> String {
    record
        .field_values()
        .into_iter()
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
