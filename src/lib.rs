pub mod config;
pub mod engine;
pub mod model;
pub mod render;
pub mod search;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use config::SearchConfig;
use engine::{ElasticEngine, MemoryEngine, SearchEngine};
use model::types::{Constraint, FilterValue, Filters, LegalSearchRequest, SearchRequest};
use search::SearchClient;
use search::filters::is_recognized;
use search::sort::sort_tokens;

fn sort_help() -> String {
    let tokens: Vec<&str> = sort_tokens().collect();
    format!("Sort order: {} (default: relevance)", tokens.join(", "))
}

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "catalog-search",
    version,
    about = "Faceted book catalog and legal document search over Elasticsearch"
)]
pub struct Cli {
    /// Path to config.toml (defaults to platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Serve from a JSON fixture instead of a live engine
    #[arg(long, global = true)]
    pub fixture: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the book catalog
    Search {
        /// Free text; omit to list everything
        query: Option<String>,

        /// Exact facet constraint, e.g. `category=ML` (repeatable)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Lower bound, e.g. `price=30000` (repeatable)
        #[arg(long = "min", value_name = "KEY=VALUE")]
        mins: Vec<String>,

        /// Upper bound, e.g. `price=50000` (repeatable)
        #[arg(long = "max", value_name = "KEY=VALUE")]
        maxs: Vec<String>,

        #[arg(long, help = sort_help())]
        sort: Option<String>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        size: u32,

        /// Include facet counts
        #[arg(long, default_value_t = false)]
        facets: bool,
    },
    /// Facet counts for the catalog, optionally filtered
    Facets {
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        #[arg(long = "min", value_name = "KEY=VALUE")]
        mins: Vec<String>,

        #[arg(long = "max", value_name = "KEY=VALUE")]
        maxs: Vec<String>,
    },
    /// Search legal documents; quote the query for an exact phrase
    Legal {
        query: String,

        #[arg(long, default_value_t = 10)]
        size: u32,
    },
    /// Complete a partially typed query
    Suggest {
        prefix: String,

        #[arg(long, default_value_t = 5)]
        size: u32,
    },
    /// Generate shell completions to stdout
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "catalog-search", &mut std::io::stdout());
        return Ok(());
    }

    let config = SearchConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match &cli.fixture {
        Some(path) => {
            let engine = MemoryEngine::from_fixture_file(path)
                .with_context(|| format!("loading fixture {}", path.display()))?;
            dispatch(SearchClient::new(engine, &config), &config, cli.command, cli.json).await
        }
        None => {
            let engine = ElasticEngine::new(&config.engine).context("building engine client")?;
            dispatch(SearchClient::new(engine, &config), &config, cli.command, cli.json).await
        }
    }
}

async fn dispatch<E: SearchEngine>(
    client: SearchClient<E>,
    config: &SearchConfig,
    command: Commands,
    json: bool,
) -> Result<()> {
    let tags = &config.highlight;
    match command {
        Commands::Search {
            query,
            filters,
            mins,
            maxs,
            sort,
            page,
            size,
            facets,
        } => {
            let request = SearchRequest {
                free_text: query,
                filters: build_filters(&filters, &mins, &maxs)?,
                sort,
                page,
                page_size: size,
            };
            let result = if facets {
                client.search_with_facets(&request).await?
            } else {
                client.search(&request).await?
            };
            emit(json, &result, || render::format_catalog(&result, page, size, tags))
        }
        Commands::Facets {
            filters,
            mins,
            maxs,
        } => {
            let buckets = client.facets(&build_filters(&filters, &mins, &maxs)?).await?;
            emit(json, &buckets, || render::format_facets(&buckets))
        }
        Commands::Legal { query, size } => {
            let request = LegalSearchRequest::new(query.clone(), size);
            let result = client.legal_search(&request).await?;
            let needle = query.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
            emit(json, &result, || render::format_legal(&result, &needle, tags))
        }
        Commands::Suggest { prefix, size } => {
            let hits = client.suggest(&prefix, size).await?;
            emit(json, &hits, || render::format_suggestions(&hits))
        }
        Commands::Completions { .. } => Ok(()),
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", human());
    }
    Ok(())
}

fn split_pair(raw: &str) -> Result<(String, FilterValue)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected KEY=VALUE, got '{raw}'");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("empty filter key in '{raw}'");
    }
    if !is_recognized(key) {
        warn!(filter = key, "unknown filter key, it will be ignored");
    }
    Ok((key.to_string(), FilterValue::parse(value.trim())))
}

/// Assemble filters from `--filter`, `--min` and `--max` flags. Bounds on the
/// same key merge into one range; a key cannot be both exact and bounded.
pub fn build_filters(exact: &[String], mins: &[String], maxs: &[String]) -> Result<Filters> {
    let mut filters = Filters::new();
    for raw in exact {
        let (key, value) = split_pair(raw)?;
        filters.insert(key, Constraint::Equals(value));
    }
    for (raw, is_min) in mins
        .iter()
        .map(|r| (r, true))
        .chain(maxs.iter().map(|r| (r, false)))
    {
        let (key, value) = split_pair(raw)?;
        let entry = filters.entry(key.clone()).or_insert(Constraint::Range {
            min: None,
            max: None,
        });
        match entry {
            Constraint::Range { min, max } => {
                if is_min {
                    *min = Some(value);
                } else {
                    *max = Some(value);
                }
            }
            Constraint::Equals(_) => bail!("'{key}' has both an exact value and a bound"),
        }
    }
    Ok(filters)
}
