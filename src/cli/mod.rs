//! CLI argument parsing and command handling

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pagedrain_core::{DrainConfig, FetchReport, OrchestratorBuilder, RateLimit, StopPolicy};
use pagedrain_vendors::{FetcherConfig, HttpPageFetcher};

/// pagedrain - drain a paginated task collection under a global rate limit
#[derive(Parser, Debug)]
#[command(name = "pagedrain")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Team / collection identifier to page through
    #[arg(short, long, env = "COLLECTION_ID")]
    pub collection: String,

    /// Authorization token, sent as the Authorization header
    #[arg(short = 'k', long, env = "TOKEN", hide_env_values = true)]
    pub token: String,

    /// API root
    #[arg(short, long, default_value = pagedrain_vendors::config::DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "10")]
    pub request_timeout_secs: u64,

    /// Name of the records array in each response
    #[arg(long, default_value = pagedrain_vendors::config::DEFAULT_ITEMS_FIELD)]
    pub items_field: String,

    /// JSON drain config file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Requests allowed per period
    #[arg(short, long)]
    pub rate: Option<u32>,

    /// Rate period in milliseconds
    #[arg(long)]
    pub period_ms: Option<u64>,

    /// Cap on concurrently running page requests (unbounded if unset)
    #[arg(long)]
    pub max_in_flight: Option<usize>,

    /// Stop after this many pages
    #[arg(long)]
    pub max_pages: Option<u64>,

    /// End of pagination: "any_anomaly" or "exhaustion_only"
    #[arg(long)]
    pub stop_policy: Option<StopPolicy>,

    /// Failed pages in a row that end the run
    #[arg(long)]
    pub max_consecutive_failures: Option<u32>,

    /// Stop issuing pages after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Write collected records as a JSON array to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the full report (records, metrics, stats) instead of only records
    #[arg(long)]
    pub full_report: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the drain configuration from the config file and flags
    pub fn drain_config(&self) -> Result<DrainConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                DrainConfig::from_json(&text)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => DrainConfig::default(),
        };

        if let Some(rate) = self.rate {
            config.rate_limit.max_requests = rate;
        }
        if let Some(period_ms) = self.period_ms {
            config.rate_limit.period_ms = period_ms;
        }
        if self.max_in_flight.is_some() {
            config.max_in_flight = self.max_in_flight;
        }
        if self.max_pages.is_some() {
            config.max_pages = self.max_pages;
        }
        if let Some(policy) = self.stop_policy {
            config.stop_policy = policy;
        }
        if let Some(max) = self.max_consecutive_failures {
            config.max_consecutive_failures = max;
        }

        config.validate().context("Invalid drain configuration")?;
        Ok(config)
    }

    /// Build the fetcher configuration from flags
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::new(&self.collection, &self.token)
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_items_field(&self.items_field)
    }

    /// Run the drain
    pub async fn run(self) -> Result<()> {
        let config = self.drain_config()?;
        let fetcher = HttpPageFetcher::new(self.fetcher_config())
            .context("Invalid fetcher configuration")?;

        let orchestrator = OrchestratorBuilder::new()
            .config(config)
            .fetcher(Arc::new(fetcher))
            .build()
            .context("Failed to build orchestrator")?;

        let report = match self.deadline_secs {
            Some(secs) => {
                orchestrator
                    .run_with_timeout(Duration::from_secs(secs))
                    .await?
            }
            None => orchestrator.run_with_signal_handling().await?,
        };

        println!("{}", report.metrics);
        if report.is_truncated() {
            eprintln!(
                "warning: {} page(s) failed, results may be incomplete (first failed page: {})",
                report.stats.pages_failed,
                report
                    .stats
                    .first_failure()
                    .map_or_else(|| "-".to_string(), |p| p.to_string())
            );
        }

        if let Some(path) = &self.output {
            write_output(path, &report, self.full_report)?;
            tracing::info!(path = %path.display(), "Wrote results");
        }

        Ok(())
    }
}

fn write_output(path: &std::path::Path, report: &FetchReport, full: bool) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);

    if full {
        serde_json::to_writer_pretty(writer, report)
    } else {
        serde_json::to_writer_pretty(writer, &report.records)
    }
    .with_context(|| format!("Failed to write {}", path.display()))
}
