//! dictcheck - Fastly dictionary site ID reconciliation
//!
//! Compares the hostname -> site ID dictionary on each configured Fastly
//! service with policy docs and prints every mismatch to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use dictcheck::{report, Coordinator, FastlyClient, PolicyDocsClient};
use dictcheck_common::config::{self, Config};
use dictcheck_common::ServiceTarget;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dictcheck")]
#[command(about = "Reconcile Fastly hostname dictionaries against policy docs", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (TOML); defaults to $DICTCHECK_CONFIG if set
    #[arg(long)]
    config: Option<PathBuf>,

    /// Service ID to check; repeat to check several. Replaces the configured list
    #[arg(long = "service", value_name = "ID")]
    services: Vec<String>,

    /// Name of the edge dictionary holding hostname -> site ID entries
    #[arg(long)]
    dictionary: Option<String>,

    /// Policy docs base URL
    #[arg(long)]
    policy_base_url: Option<String>,

    /// Fastly API base URL
    #[arg(long)]
    fastly_api_url: Option<String>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_overrides(self, mut config: Config) -> Config {
        if !self.services.is_empty() {
            config.services = self.services.into_iter().map(ServiceTarget::new).collect();
        }
        if let Some(dictionary) = self.dictionary {
            config.dictionary_name = dictionary;
        }
        if let Some(url) = self.policy_base_url {
            config.policy_base_url = url;
        }
        if let Some(url) = self.fastly_api_url {
            config.fastly_api_url = url;
        }
        config
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Error chain on one line: `outer: cause: root cause`
fn diagnostic(err: &anyhow::Error) -> String {
    format!("{:#}", err).replace('\n', " ")
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", diagnostic(&e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("dictcheck v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let config = cli.apply_overrides(config);
    config.validate().context("Invalid configuration")?;
    let api_key = config::api_key_from_env()?;

    let fastly = FastlyClient::new(&config.fastly_api_url, &api_key, config.http_timeout())
        .context("Unable to create fastly client")?;
    let policy = PolicyDocsClient::new(&config.policy_base_url, config.http_timeout())
        .context("Unable to create policy docs client")?;

    let coordinator = Coordinator::new(
        Arc::new(fastly),
        Arc::new(policy),
        config.services,
        config.dictionary_name,
    );
    let summary = coordinator.run().await?;

    let stdout = std::io::stdout();
    report::write_report(&mut stdout.lock(), &summary.discrepancies)
        .context("Failed to write report")?;

    Ok(())
}
