//! Venue, seed and citation harvesting.
//!
//! The harvester walks venues in order, keyword-filters each venue's seeds,
//! expands every surviving seed through its forward citations (and, when
//! asked, its references), and appends provenance-tagged batches to a
//! [`ResultCollector`]. Everything runs sequentially so one API key never
//! has more than one request in flight.

use crate::client::HttpTransport;
use crate::error::Result;
use crate::keywords::KeywordFilter;
use crate::record::{tag_all, PaperRecord, Source};
use crate::semanticscholar::SemanticScholar;
use std::collections::HashMap;
use tracing::{info, warn};

/// Default earliest publication year
pub const DEFAULT_YEAR_FROM: i32 = 2005;

/// Default bulk-search page size
pub const DEFAULT_LIMIT: u32 = 4000;

/// Default citation page size argument (overridden by [`crate::semanticscholar::EDGE_PAGE_SIZE`])
pub const DEFAULT_BATCH_SIZE: u32 = 100;

/// Which citation-graph edges to follow from each seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Traversal {
    #[default]
    Citations,
    CitationsAndReferences,
}

#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub year_from: i32,
    pub limit: u32,
    pub batch_size: u32,
    pub traversal: Traversal,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            year_from: DEFAULT_YEAR_FROM,
            limit: DEFAULT_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            traversal: Traversal::Citations,
        }
    }
}

/// Ordered batches of tagged rows
#[derive(Debug, Default)]
pub struct ResultCollector {
    batches: Vec<Vec<PaperRecord>>,
}

impl ResultCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch: Vec<PaperRecord>) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Rows before deduplication
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Concatenate batches and drop repeated `paper_id`s, keeping the first.
    ///
    /// A repeat flagged `cited_by_empty` with the same source as the kept
    /// row only transfers the flag.
    pub fn into_rows(self) -> Vec<PaperRecord> {
        let before = self.row_count();
        let mut rows: Vec<PaperRecord> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for record in self.batches.into_iter().flatten() {
            match seen.get(&record.paper_id) {
                Some(&idx) => {
                    let kept = &mut rows[idx];
                    if record.cited_by_empty == Some(true) && kept.source == record.source {
                        kept.cited_by_empty = Some(true);
                    }
                }
                None => {
                    seen.insert(record.paper_id.clone(), rows.len());
                    rows.push(record);
                }
            }
        }

        info!(before, after = rows.len(), "Deduplicated rows by paper_id");
        rows
    }
}

/// Counters logged at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub venues_searched: usize,
    pub venues_skipped: usize,
    pub seeds_expanded: usize,
    pub seeds_without_citations: usize,
}

/// Sequential venue/citation harvester
pub struct Harvester<T> {
    api: SemanticScholar<T>,
    keywords: KeywordFilter,
    options: HarvestOptions,
}

impl<T: HttpTransport> Harvester<T> {
    pub fn new(api: SemanticScholar<T>, keywords: KeywordFilter, options: HarvestOptions) -> Self {
        Self {
            api,
            keywords,
            options,
        }
    }

    pub fn api(&self) -> &SemanticScholar<T> {
        &self.api
    }

    /// Harvest all venues into a fresh collector.
    pub async fn run(&self, venues: &[String]) -> Result<ResultCollector> {
        let mut collector = ResultCollector::new();
        let mut summary = HarvestSummary::default();

        for venue in venues {
            self.harvest_venue(venue, &mut collector, &mut summary).await?;
        }

        info!(
            venues_searched = summary.venues_searched,
            venues_skipped = summary.venues_skipped,
            seeds_expanded = summary.seeds_expanded,
            seeds_without_citations = summary.seeds_without_citations,
            rows = collector.row_count(),
            batches = collector.batch_count(),
            "Harvest complete"
        );
        Ok(collector)
    }

    async fn harvest_venue(
        &self,
        venue: &str,
        collector: &mut ResultCollector,
        summary: &mut HarvestSummary,
    ) -> Result<()> {
        summary.venues_searched += 1;
        let year_from = self.options.year_from;

        let seeds = self
            .api
            .search_venue_bulk(venue, year_from, self.options.limit)
            .await?;
        if seeds.is_empty() {
            warn!(venue, "No papers found for venue");
            summary.venues_skipped += 1;
            return Ok(());
        }

        let seeds = self.keywords.retain(seeds);
        if !self.keywords.is_empty() {
            info!(venue, kept = seeds.len(), "Papers after keyword filter");
        }
        if seeds.is_empty() {
            warn!(venue, "No papers cleared the keyword filter");
            summary.venues_skipped += 1;
            return Ok(());
        }

        let seeds = tag_all(seeds, &Source::Venue(venue.to_string()));
        collector.push(seeds.clone());

        for seed in &seeds {
            self.expand_seed(seed, collector, summary).await?;
        }
        Ok(())
    }

    async fn expand_seed(
        &self,
        seed: &PaperRecord,
        collector: &mut ResultCollector,
        summary: &mut HarvestSummary,
    ) -> Result<()> {
        summary.seeds_expanded += 1;
        let year_from = self.options.year_from;

        let citations = self.api.forward_citations(&seed.paper_id, year_from).await?;
        if citations.is_empty() {
            summary.seeds_without_citations += 1;
            collector.push(vec![seed.marked_cited_by_empty()]);
        } else {
            let kept = self.keywords.retain(citations);
            if !self.keywords.is_empty() {
                info!(paper_id = %seed.paper_id, kept = kept.len(), "Citations after keyword filter");
            }
            collector.push(tag_all(kept, &Source::CitedBy(seed.paper_id.clone())));
        }

        if self.options.traversal == Traversal::CitationsAndReferences {
            let references = self
                .api
                .backward_references(&seed.paper_id, year_from)
                .await?;
            let kept = self.keywords.retain(references);
            if !self.keywords.is_empty() {
                info!(paper_id = %seed.paper_id, kept = kept.len(), "References after keyword filter");
            }
            collector.push(tag_all(kept, &Source::References(seed.paper_id.clone())));
        }

        Ok(())
    }
}
