//! Harvest
//!
//! Launches one run of a remote automation agent, polls the platform
//! until the run's output is available, extracts result-artifact URLs
//! from the output, saves the raw output locally, and uploads it to
//! S3.
//!
//! Architecture:
//! - Configuration: credential blob from the environment, tunables
//!   from CLI flags, validated before any network call
//! - Launcher: launch with exponential backoff on rate limiting
//! - Poller: fixed-interval bounded polling of the output endpoint
//! - Extraction: tolerant URL discovery in the polymorphic output
//! - Storage: local copy plus S3 upload behind a trait
//!
//! Exit code 0 only when the full sequence succeeded; any stage
//! failure is reported on stderr and exits non-zero.

mod config;
mod launcher;
mod poller;
mod run;
mod storage;
#[cfg(test)]
mod testutil;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Cli, Config};
use crate::storage::S3Store;
use harvest_client::AgentClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harvest=info,harvest_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli)?;
    debug!(
        region = %config.credentials.region,
        bucket = %config.credentials.bucket_name,
        "resolved storage target"
    );

    let mut client = AgentClient::new(
        config.api_url.as_str(),
        config.credentials.api_key.as_str(),
    );
    if let Some(cookie) = &config.credentials.session_cookie {
        client = client.with_session_cookie(cookie.as_str());
    }
    let store = S3Store::new(&config.credentials);

    match run::run(&config, &client, &store).await {
        Ok(outcome) => {
            info!("run complete");
            println!(
                "{} {}",
                "✓ Uploaded:".green().bold(),
                outcome.upload_location
            );
            Ok(())
        }
        Err(e) => {
            error!("{} stage failed: {}", e.stage(), e);
            Err(anyhow::anyhow!("{} stage failed: {}", e.stage(), e))
        }
    }
}
