use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use perceptions_archive::{
    AssemblerConfig, BrightDataSearch, ContentAssembler, DocumentPartitioner, HttpFetcher,
};
use perceptions_common::Config;
use perceptions_scout::pipeline::{self, StageReport, Workers};
use perceptions_scout::{load_plants, ClaudeScorer, Plant, ResultsStore};
use reader_client::ReaderClient;

#[derive(Parser)]
#[command(
    name = "perceptions-scout",
    about = "Search, fetch and score public perceptions of renewable energy plants"
)]
struct Cli {
    /// JSON array of {plant_code, search_query, plant_info}
    #[arg(long, global = true, default_value = "plants.json")]
    plants: PathBuf,

    /// Overrides RESULTS_DIR
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(flatten)]
    workers: WorkerArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Copy)]
struct WorkerArgs {
    #[arg(long, global = true, default_value_t = 100)]
    search_workers: usize,
    #[arg(long, global = true, default_value_t = 10)]
    content_workers: usize,
    #[arg(long, global = true, default_value_t = 5)]
    relevance_workers: usize,
    #[arg(long, global = true, default_value_t = 2)]
    score_workers: usize,
}

impl From<WorkerArgs> for Workers {
    fn from(args: WorkerArgs) -> Self {
        Workers {
            search: args.search_workers,
            content: args.content_workers,
            relevance: args.relevance_workers,
            score: args.score_workers,
        }
    }
}

#[derive(Subcommand, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Query the search provider for each plant
    Search,
    /// Fetch and extract every search result
    Content,
    /// Grade each search result 1-5
    ArticleRelevance,
    /// Grade each plant's result set as a whole 1-5
    ContentRelevance,
    /// Keep documents graded 4 or higher
    RelevantContent,
    /// Score opposition and support from the relevant content
    Score,
    /// All stages in order
    Run,
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("perceptions=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn content_assembler(config: &Config) -> Result<ContentAssembler> {
    let reader = config
        .reader_base_url
        .as_deref()
        .map(|base| ReaderClient::new(base, config.reader_api_key.as_deref(), config.fetch_timeout))
        .transpose()
        .context("Failed to build reader client")?;
    let fetcher =
        HttpFetcher::new(config.fetch_timeout, reader)?.with_max_body_bytes(config.max_body_bytes);

    Ok(ContentAssembler::new(
        Arc::new(fetcher),
        Arc::new(DocumentPartitioner),
        AssemblerConfig::from(config),
    ))
}

async fn run_command(
    command: Command,
    config: &Config,
    store: &ResultsStore,
    plants: &[Plant],
    workers: Workers,
) -> Result<Vec<StageReport>> {
    let all = command == Command::Run;
    let mut reports = Vec::new();

    if all || command == Command::Search {
        let provider = BrightDataSearch::new(config.require_serp_key()?)?;
        reports.push(pipeline::run_search(store, plants, &provider, workers.search).await);
    }
    if all || command == Command::Content {
        let assembler = content_assembler(config)?;
        reports.push(pipeline::run_content(store, plants, &assembler, workers.content).await);
    }

    let needs_scorer = all
        || matches!(
            command,
            Command::ArticleRelevance | Command::ContentRelevance | Command::Score
        );
    let scorer = if needs_scorer {
        Some(ClaudeScorer::from_config(config)?)
    } else {
        None
    };

    if let Some(scorer) = &scorer {
        if all || command == Command::ArticleRelevance {
            let report =
                pipeline::run_article_relevance(store, plants, scorer, workers.relevance).await;
            reports.push(report);
        }
        if all || command == Command::ContentRelevance {
            let report =
                pipeline::run_content_relevance(store, plants, scorer, workers.relevance).await;
            reports.push(report);
        }
    }
    if all || command == Command::RelevantContent {
        reports.push(pipeline::run_relevant_content(store, plants).await);
    }
    if let Some(scorer) = &scorer {
        if all || command == Command::Score {
            reports.push(pipeline::run_scores(store, plants, scorer, workers.score).await);
        }
    }

    Ok(reports)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    info!("perceptions-scout starting");

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.results_dir {
        config.results_dir = dir;
    }

    let plants = load_plants(&cli.plants)?;
    let store = ResultsStore::new(config.results_dir.clone());

    let reports = run_command(cli.command, &config, &store, &plants, cli.workers.into()).await?;

    let failed: usize = reports.iter().map(|r| r.failed).sum();
    for report in &reports {
        info!("{report}");
    }
    info!(
        stages = reports.len(),
        failed,
        results_dir = %store.root().display(),
        "perceptions-scout complete"
    );

    Ok(())
}
