use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lifestats::config::{Environment, Settings};
use lifestats::display::{OutputFormat, Presenter};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(
    name = "lifestats",
    version,
    about = "Mine food and category frequencies from a paginated stats endpoint",
    long_about = None
)]
struct Cli {
    /// Settings file with one table per environment (defaults to ./config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment table to load (development, production, test)
    #[arg(short, long)]
    env: Option<Environment>,

    /// Endpoint URL
    #[arg(long)]
    url: Option<String>,

    /// First item id (inclusive)
    #[arg(long)]
    first_id: Option<u64>,

    /// Last item id (exclusive)
    #[arg(long)]
    last_id: Option<u64>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pool: Option<usize>,

    /// Total requests per second shared by all workers
    #[arg(short, long)]
    rate_limit: Option<f64>,

    /// Page size requested from the endpoint
    #[arg(long)]
    results_per_page: Option<u32>,

    /// Minimum seconds between progress lines per worker (0 logs every page)
    #[arg(long)]
    log_span: Option<u64>,

    /// Number of foods to rank
    #[arg(long)]
    top_foods: Option<usize>,

    /// Number of categories to rank
    #[arg(long)]
    top_categories: Option<usize>,

    /// Retries per page on transient errors
    #[arg(long)]
    max_retries: Option<u32>,

    /// Result format (text, json); defaults by environment
    #[arg(short, long)]
    output: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,
}

impl Cli {
    fn settings(&self) -> Result<Settings> {
        let environment = match self.env {
            Some(environment) => environment,
            None => Environment::from_env()?,
        };

        let default_config = PathBuf::from(DEFAULT_CONFIG);
        let path = self
            .config
            .as_deref()
            .or_else(|| default_config.exists().then_some(default_config.as_path()));

        let mut settings = Settings::load(path, environment)
            .with_context(|| format!("Failed to load {environment} settings"))?;

        if let Some(url) = &self.url {
            settings.url = url.clone();
        }
        if let Some(v) = self.first_id {
            settings.first_id = v;
        }
        if let Some(v) = self.last_id {
            settings.last_id = v;
        }
        if let Some(v) = self.pool {
            settings.pool_size = v;
        }
        if let Some(v) = self.rate_limit {
            settings.rate_limit = v;
        }
        if let Some(v) = self.results_per_page {
            settings.results_per_page = v;
        }
        if let Some(v) = self.log_span {
            settings.log_span = v;
        }
        if let Some(v) = self.top_foods {
            settings.top_n_primary = v;
        }
        if let Some(v) = self.top_categories {
            settings.top_n_secondary = v;
        }
        if let Some(v) = self.max_retries {
            settings.max_retries = v;
        }

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let settings = cli.settings()?;
    let output = cli
        .output
        .unwrap_or_else(|| OutputFormat::for_environment(settings.environment));

    tracing::info!(
        environment = %settings.environment,
        url = %settings.url,
        first_id = settings.first_id,
        last_id = settings.last_id,
        pool = settings.pool_size,
        rate_limit = settings.rate_limit,
        "lifestats starting"
    );

    let cancel = CancellationToken::new();
    tokio::spawn(watch_ctrl_c(cancel.clone()));

    let summary = lifestats::crawler::run(settings, cancel)
        .await
        .context("Mining run failed")?;

    let mut stdout = std::io::stdout().lock();
    output
        .presenter()
        .present(&summary, &mut stdout)
        .context("Failed to write results")?;
    stdout.flush()?;

    if summary.partial {
        tracing::warn!(
            reports = summary.reports_received,
            workers = summary.workers,
            "Results are partial"
        );
    }

    Ok(())
}

/// Cancel the run on the first Ctrl-C
async fn watch_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Interrupt received, stopping workers");
            cancel.cancel();
        }
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    // RUST_LOG wins when set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("lifestats=debug,info")
        } else {
            tracing_subscriber::EnvFilter::new("lifestats=info,warn")
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        "text" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        other => anyhow::bail!("Unknown log format: {other}"),
    }

    Ok(())
}
