use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kokkai_collector::cache::CacheStore;
use kokkai_collector::checkpoint::CheckpointStore;
use kokkai_collector::config::ConfigLoader;
use kokkai_collector::domain::ProcessDate;
use kokkai_collector::error::CollectorError;
use kokkai_collector::fetcher::{CachedFetcher, HttpRecordClient, RateLimitedFetcher};
use kokkai_collector::harvest::{Endpoints, Harvester};
use kokkai_collector::output::{JsonFileSink, JsonOutput};

#[derive(Parser)]
#[command(name = "kokkai-collector")]
#[command(about = "Collect Diet meeting records day by day, resuming from the last checkpoint")]
#[command(version)]
struct Cli {
    /// First day to process (YYYY-MM-DD); defaults to the saved checkpoint
    #[arg(short, long)]
    start_date: Option<ProcessDate>,

    /// Last day to process (YYYY-MM-DD); without it the run does not stop on its own
    #[arg(short, long)]
    end_date: Option<ProcessDate>,

    /// JSON config file
    #[arg(long)]
    config: Option<String>,

    /// Stop after this many completed days
    #[arg(long)]
    max_days: Option<usize>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CollectorError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CollectorError) -> u8 {
    match error {
        CollectorError::InvalidDate(_)
        | CollectorError::ConfigRead(_)
        | CollectorError::Config(_) => 2,
        CollectorError::Transport { .. } | CollectorError::HttpStatus { .. } => 3,
        CollectorError::EmptyResponse { .. }
        | CollectorError::PaginationOverflow { .. }
        | CollectorError::MalformedResponse { .. }
        | CollectorError::InvalidIssueId(_) => 4,
        CollectorError::CorruptCache { .. } | CollectorError::CorruptCheckpoint { .. } => 5,
        CollectorError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref(), |name| std::env::var(name).ok())?;

    let client = HttpRecordClient::new(config.http_timeout)?;
    let fetcher = CachedFetcher::new(
        CacheStore::new(config.cache_dir.clone()),
        RateLimitedFetcher::new(client, config.request_interval),
    );
    let harvester = Harvester::new(
        fetcher,
        CheckpointStore::new(config.checkpoint_dir.clone(), config.default_process_date),
        JsonFileSink::new(config.output_dir.clone()),
        Endpoints {
            list_url: config.list_url.clone(),
            detail_url: config.detail_url.clone(),
        },
    );

    let summary = harvester
        .run(cli.start_date, cli.end_date)?
        .drive(cli.max_days)?;

    if cli.json {
        JsonOutput::print_summary(&summary).into_diagnostic()?;
    }
    Ok(())
}
