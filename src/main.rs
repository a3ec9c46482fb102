//! s2harvest - Semantic Scholar venue harvester
//!
//! Enumerates every paper of the given venues, expands each seed through its
//! forward citations, keeps rows matching the keyword list and writes them to
//! CSV.
//!
//! ## Usage
//!
//! ```bash
//! s2harvest harvest --venues NeurIPS ICML --year-from 2018 --keywords-file kws.txt
//! s2harvest citations 649def34f8be52c8b66281af98ae884c09aef38b --references
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use s2harvest::client::ApiClient;
use s2harvest::config::{self, ApiConfig};
use s2harvest::harvest::{
    HarvestOptions, Harvester, Traversal, DEFAULT_BATCH_SIZE, DEFAULT_LIMIT, DEFAULT_YEAR_FROM,
};
use s2harvest::keywords::KeywordFilter;
use s2harvest::output;
use s2harvest::record::{tag_all, Source};
use s2harvest::retry::RetryPolicy;
use s2harvest::semanticscholar::SemanticScholar;
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Relevance model path accepted for compatibility
const DEFAULT_MODEL: &str = "relevance_head.joblib";

// ============================================================================
// CLI Definition
// ============================================================================

/// Semantic Scholar venue harvester with citation expansion
#[derive(Parser)]
#[command(name = "s2harvest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest venues and expand their papers through citations
    Harvest {
        /// Venue names
        #[arg(long, num_args = 1..)]
        venues: Vec<String>,

        /// File of venue names, one per line
        #[arg(long, alias = "venues_file")]
        venues_file: Option<PathBuf>,

        /// Earliest publication year (inclusive)
        #[arg(long, alias = "year_from", default_value_t = DEFAULT_YEAR_FROM)]
        year_from: i32,

        /// Bulk-search page size
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: u32,

        /// Citation page size (the API maximum of 1000 is always used)
        #[arg(long, alias = "batch_size", default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: u32,

        /// Relevance threshold (not used by the pipeline)
        #[arg(long, default_value_t = 0.0)]
        threshold: f64,

        /// Relevance model path (not used by the pipeline)
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// File of keywords, one per line
        #[arg(long, alias = "keywords_file")]
        keywords_file: Option<PathBuf>,

        /// Output CSV
        #[arg(long, alias = "out_csv", default_value = "harvest_bulk.csv")]
        out_csv: PathBuf,

        /// Also follow each seed's references
        #[arg(long)]
        references: bool,

        #[command(flatten)]
        api: ApiArgs,
    },

    /// Fetch the citations (or references) of a single paper
    Citations {
        /// Semantic Scholar paper ID (or prefixed ID such as DOI:...)
        paper_id: String,

        /// Fetch references instead of citing papers
        #[arg(long)]
        references: bool,

        /// Earliest publication year (inclusive)
        #[arg(long, alias = "year_from", default_value_t = DEFAULT_YEAR_FROM)]
        year_from: i32,

        /// File of keywords, one per line
        #[arg(long, alias = "keywords_file")]
        keywords_file: Option<PathBuf>,

        /// Output CSV
        #[arg(long, alias = "out_csv", default_value = "citations.csv")]
        out_csv: PathBuf,

        #[command(flatten)]
        api: ApiArgs,
    },
}

#[derive(Args)]
struct ApiArgs {
    /// Semantic Scholar API key (falls back to SEMANTIC_SCHOLAR_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// API base URL (falls back to SEMANTIC_SCHOLAR_API_BASE)
    #[arg(long)]
    api_base: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl ApiArgs {
    fn connect(self) -> Result<SemanticScholar<ApiClient>> {
        let config = ApiConfig::resolve(self.api_key, self.api_base, self.timeout_secs);
        let client = ApiClient::new(&config).context("Failed to create API client")?;
        let api = SemanticScholar::new(client, &config.base_url, RetryPolicy::default())
            .context("Invalid API base URL")?;
        Ok(api)
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.log_json {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Harvest {
            venues,
            venues_file,
            year_from,
            limit,
            batch_size,
            threshold,
            model,
            keywords_file,
            out_csv,
            references,
            api,
        } => {
            if threshold != 0.0 || model != DEFAULT_MODEL {
                warn!(threshold, model = %model, "Relevance scoring is not part of the pipeline, ignoring --threshold/--model");
            }
            let venues = config::resolve_venues(&venues, venues_file.as_deref())
                .context("Failed to load venues")?;
            let keywords = config::load_keywords(keywords_file.as_ref())
                .context("Failed to load keywords")?;
            config::check_year_from(year_from);

            let options = HarvestOptions {
                year_from,
                limit,
                batch_size,
                traversal: if references {
                    Traversal::CitationsAndReferences
                } else {
                    Traversal::Citations
                },
            };
            run_harvest(api, venues, keywords, options, &out_csv).await
        }
        Commands::Citations {
            paper_id,
            references,
            year_from,
            keywords_file,
            out_csv,
            api,
        } => {
            let keywords = config::load_keywords(keywords_file.as_ref())
                .context("Failed to load keywords")?;
            run_citations(api, &paper_id, references, year_from, keywords, &out_csv).await
        }
    }
}

// ============================================================================
// Pipelines
// ============================================================================

async fn run_harvest(
    api: ApiArgs,
    venues: Vec<String>,
    keywords: Vec<String>,
    options: HarvestOptions,
    out_csv: &Path,
) -> Result<()> {
    info!(
        venues = venues.len(),
        keywords = keywords.len(),
        year_from = options.year_from,
        traversal = ?options.traversal,
        "Starting harvest"
    );

    let harvester = Harvester::new(api.connect()?, KeywordFilter::new(&keywords), options);
    let collector = harvester.run(&venues).await.context("Harvest aborted")?;

    let rows = collector.into_rows();
    if rows.is_empty() {
        println!("No papers cleared the keyword filter.");
        return Ok(());
    }

    let paths = output::write_outputs(out_csv, &rows).context("Failed to write CSV output")?;
    println!("Wrote {} papers to {}", rows.len(), paths.full.display());
    println!(
        "Wrote no-abstracts file with {} rows to {}",
        rows.len(),
        paths.noabs.display()
    );
    Ok(())
}

async fn run_citations(
    api: ApiArgs,
    paper_id: &str,
    references: bool,
    year_from: i32,
    keywords: Vec<String>,
    out_csv: &Path,
) -> Result<()> {
    let api = api.connect()?;
    let (rows, source) = if references {
        (
            api.backward_references(paper_id, year_from).await?,
            Source::References(paper_id.to_string()),
        )
    } else {
        (
            api.forward_citations(paper_id, year_from).await?,
            Source::CitedBy(paper_id.to_string()),
        )
    };

    let rows = tag_all(KeywordFilter::new(&keywords).retain(rows), &source);
    if rows.is_empty() {
        println!("No papers found for {}.", paper_id);
        return Ok(());
    }

    let paths = output::write_outputs(out_csv, &rows).context("Failed to write CSV output")?;
    println!("Wrote {} papers to {}", rows.len(), paths.full.display());
    Ok(())
}
