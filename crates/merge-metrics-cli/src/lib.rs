//! # Merge-Metrics CLI
//!
//! Command-line interface for backfilling and inspecting pull request merge
//! metrics.
//!
//! This module provides CLI commands for:
//! - Fetching historical pull requests and emitting idempotent SQL upserts
//! - Summarizing a JSON-file metric store as dashboard aggregates

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use merge_metrics_core::{
    adapters::{
        FilesystemMetricStore, GitHubClient, GitHubClientConfig, InMemoryMetricStore, JiraClient,
        JiraClientConfig,
    },
    sql, DashboardSummary, DeriveError, DesignatedReviewers, MetricDeriver, MetricQuery,
    MetricStore, PrMetric, Priority, RepoName, SecretValue, SourceError, StoreError, TicketCache,
    TicketEnricher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// Merge-Metrics CLI - pull request merge metrics from GitHub and Jira
#[derive(Parser)]
#[command(name = "merge-metrics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Backfill and summarize pull request merge metrics")]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch recent pull requests and print upserts for them
    Fetch(FetchArgs),

    /// Print dashboard aggregates for a JSON-file metric store
    Summary(SummaryArgs),
}

/// Arguments of `fetch`
#[derive(clap::Args)]
pub struct FetchArgs {
    /// Repositories as owner/name
    #[arg(required = true)]
    pub repos: Vec<RepoName>,

    /// Only pull requests created within this many days
    #[arg(short, long, default_value = "365")]
    pub days: u32,

    /// Output format
    #[arg(short, long, default_value = "sql")]
    pub format: OutputFormat,

    /// Login whose reviews count towards the QA track (repeatable)
    #[arg(long = "designated-reviewer")]
    pub designated_reviewers: Vec<String>,

    /// Write output to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, value_parser = parse_secret)]
    pub github_token: SecretValue,

    /// Jira site URL
    #[arg(long, env = "JIRA_BASE_URL")]
    pub jira_base_url: Option<String>,

    /// Jira account email
    #[arg(long, env = "JIRA_EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true, value_parser = parse_secret)]
    pub jira_api_token: Option<SecretValue>,
}

/// Arguments of `summary`
#[derive(clap::Args)]
pub struct SummaryArgs {
    /// JSON file written by the service's filesystem store
    #[arg(short, long)]
    pub store: PathBuf,

    /// First opened date to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last opened date to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Only this author
    #[arg(long)]
    pub author: Option<String>,

    /// Only this repository (owner/name)
    #[arg(long)]
    pub repo: Option<String>,

    /// Only this priority
    #[arg(long)]
    pub priority: Option<Priority>,
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Postgres upsert statements
    Sql,
    /// JSON array of records
    Json,
}

fn parse_secret(value: &str) -> Result<SecretValue, String> {
    let secret = SecretValue::new(value);
    if secret.is_empty() {
        return Err("must not be empty".to_string());
    }
    Ok(secret)
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Upstream request failed: {0}")]
    Source(#[from] SourceError),

    #[error("Metric store error: {0}")]
    Store(#[from] StoreError),

    #[error("Metric derivation failed: {0}")]
    Derive(#[from] DeriveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ============================================================================
// Batch Configuration
// ============================================================================

/// Validated settings of one `fetch` run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub repos: Vec<RepoName>,
    pub window_days: u32,
    pub format: OutputFormat,
    pub designated: DesignatedReviewers,
    pub github: GitHubClientConfig,
    pub jira: Option<JiraClientConfig>,
}

impl BatchConfig {
    /// Validate arguments; Jira settings must be given all together or not at all
    pub fn from_args(args: &FetchArgs) -> Result<Self, CliError> {
        if args.days == 0 {
            return Err(CliError::InvalidArgument {
                arg: "--days".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let jira = match (&args.jira_base_url, &args.jira_email, &args.jira_api_token) {
            (Some(base_url), Some(email), Some(token)) => Some(JiraClientConfig::new(
                base_url.clone(),
                email.clone(),
                token.clone(),
            )),
            (None, None, None) => None,
            _ => {
                return Err(CliError::InvalidArgument {
                    arg: "--jira-*".to_string(),
                    message: "JIRA_BASE_URL, JIRA_EMAIL and JIRA_API_TOKEN must be set together"
                        .to_string(),
                })
            }
        };

        Ok(Self {
            repos: args.repos.clone(),
            window_days: args.days,
            format: args.format,
            designated: DesignatedReviewers::new(&args.designated_reviewers),
            github: GitHubClientConfig::new(args.github_token.clone())
                .with_api_url(args.github_api_url.clone()),
            jira,
        })
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli);

    match cli.command {
        Commands::Fetch(args) => {
            let config = BatchConfig::from_args(&args)?;
            let records = run_fetch(&config, Utc::now()).await?;

            if records.is_empty() {
                warn!(days = config.window_days, "No pull requests found in the window");
                return Ok(());
            }

            let rendered = render(&records, config.format)?;
            write_output(args.output.as_deref(), &rendered).await?;
            info!(rows = records.len(), "Done");
            Ok(())
        }
        Commands::Summary(args) => {
            let summary = run_summary(&args, Utc::now().date_naive()).await?;
            let rendered = serde_json::to_string_pretty(&summary)?;
            write_output(None, &rendered).await
        }
    }
}

/// Logs go to stderr so stdout carries only the rendered output
fn initialize_logging(cli: &Cli) {
    let level = &cli.log_level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("merge_metrics_cli={level},merge_metrics_core={level}").into()
    });

    let json = cli.json_logs;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Derive a metric row for every pull request created in the window.
///
/// Rows are derived into an in-memory store, so a pull request listed twice
/// collapses into one row. Ticket lookups share one cache across all repos.
#[instrument(skip(config), fields(repos = config.repos.len(), days = config.window_days))]
pub async fn run_fetch(config: &BatchConfig, now: DateTime<Utc>) -> Result<Vec<PrMetric>, CliError> {
    let github = Arc::new(GitHubClient::new(config.github.clone())?);
    let store = Arc::new(InMemoryMetricStore::new());

    let mut deriver = MetricDeriver::new(store.clone())
        .with_timeline_source(github.clone())
        .with_review_source(github.clone(), config.designated.clone());

    match &config.jira {
        Some(jira) => {
            let client = JiraClient::new(jira.clone())?;
            deriver = deriver.with_ticket_enricher(TicketEnricher::new(Arc::new(client)));
        }
        None => warn!("Jira credentials not set; priority defaults to medium and due dates stay empty"),
    }

    let since = now - Duration::days(i64::from(config.window_days));
    let cache = TicketCache::new();

    for repo in &config.repos {
        info!(repo = %repo, since = %since.date_naive(), "Fetching pull requests");
        let pulls = github.list_pull_requests(repo, since).await?;
        info!(repo = %repo, count = pulls.len(), "Found pull requests");

        for pr in &pulls {
            deriver.record_snapshot(repo, pr, &cache).await?;
        }
    }

    let stats = cache.stats().await;
    info!(
        tickets = cache.len().await,
        hits = stats.hits,
        misses = stats.misses,
        "Ticket cache"
    );

    Ok(store.all().await)
}

/// Render derived rows in the requested format
pub fn render(records: &[PrMetric], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Sql => Ok(sql::render_upsert_batch(records)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
    }
}

/// Aggregate a filesystem store; all rows are included unless filtered
#[instrument(skip(args), fields(store = %args.store.display()))]
pub async fn run_summary(args: &SummaryArgs, today: NaiveDate) -> Result<DashboardSummary, CliError> {
    if !tokio::fs::try_exists(&args.store).await? {
        return Err(CliError::InvalidArgument {
            arg: "--store".to_string(),
            message: format!("{} does not exist", args.store.display()),
        });
    }

    let store = FilesystemMetricStore::open(&args.store).await?;
    let query = MetricQuery {
        from: args.from,
        to: args.to,
        author: args.author.clone(),
        repo: args.repo.clone(),
        priority: args.priority,
    };
    let records = store.query(&query).await?;
    let summary = DashboardSummary::build(&records, today);

    if !query.has_attribute_filters() {
        return Ok(summary);
    }
    let option_rows = store.query(&query.date_range_only()).await?;
    Ok(summary.with_filter_options(&option_rows))
}

async fn write_output(path: Option<&Path>, rendered: &str) -> Result<(), CliError> {
    match path {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            info!(path = %path.display(), "Wrote output");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
