//! Run configuration
//!
//! Credentials arrive as one JSON blob in the `HARVEST_CREDENTIALS`
//! environment variable, matching the single-secret convention of the
//! deployment environment (camelCase keys). Tunables (attempt caps,
//! intervals, output directory) come from CLI flags with environment
//! fallbacks. Everything is validated up front: a bad configuration
//! must fail before the first network call.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable holding the credential JSON blob.
pub const CREDENTIALS_ENV: &str = "HARVEST_CREDENTIALS";

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{CREDENTIALS_ENV} environment variable not set")]
    MissingEnv,

    #[error("invalid credentials JSON: {0}")]
    InvalidJson(String),

    #[error("credential field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("{0} must be greater than 0")]
    ZeroTunable(&'static str),
}

/// Credential blob, camelCase keys as provisioned
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub api_key: String,
    pub agent_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket_name: String,
    /// Only needed for accounts behind session-based auth
    #[serde(default)]
    pub session_cookie: Option<String>,
}

impl Credentials {
    /// Parse a credential blob from its JSON representation.
    ///
    /// A missing required key is a parse error; empty values are
    /// caught separately so the message names the field.
    pub fn parse(json: &str) -> Result<Self, ConfigError> {
        let creds: Credentials =
            serde_json::from_str(json).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;
        creds.check_non_empty()?;
        Ok(creds)
    }

    /// Load the credential blob from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var(CREDENTIALS_ENV).map_err(|_| ConfigError::MissingEnv)?;
        Self::parse(&raw)
    }

    fn check_non_empty(&self) -> Result<(), ConfigError> {
        let fields = [
            ("apiKey", &self.api_key),
            ("agentId", &self.agent_id),
            ("accessKeyId", &self.access_key_id),
            ("secretAccessKey", &self.secret_access_key),
            ("region", &self.region),
            ("bucketName", &self.bucket_name),
        ];
        for (name, value) in fields {
            if value.is_empty() {
                return Err(ConfigError::EmptyField(name));
            }
        }
        Ok(())
    }
}

/// Command-line tunables
#[derive(Debug, Parser)]
#[command(name = "harvest")]
#[command(about = "Launch a remote agent, harvest its output, upload it to S3", long_about = None)]
pub struct Cli {
    /// Agent platform API base URL
    #[arg(long, env = "HARVEST_API_URL", default_value = "https://api.phantombuster.com")]
    pub api_url: String,

    /// Launch attempts before giving up on rate limiting
    #[arg(long, env = "HARVEST_LAUNCH_ATTEMPTS", default_value_t = 5)]
    pub launch_attempts: u32,

    /// Base delay in seconds for launch backoff (doubles per retry)
    #[arg(long, env = "HARVEST_LAUNCH_BASE_DELAY", default_value_t = 10)]
    pub launch_base_delay_secs: u64,

    /// Output poll attempts before timing out
    #[arg(long, env = "HARVEST_POLL_ATTEMPTS", default_value_t = 30)]
    pub poll_attempts: u32,

    /// Fixed delay in seconds between poll attempts
    #[arg(long, env = "HARVEST_POLL_INTERVAL", default_value_t = 20)]
    pub poll_interval_secs: u64,

    /// Directory for the local copy of the raw output
    #[arg(long, env = "HARVEST_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Also write the extracted JSON artifact URL to a text file
    #[arg(long)]
    pub save_url_file: bool,

    /// Also upload the raw output under the stable latest.json key
    #[arg(long)]
    pub upload_latest: bool,
}

/// Resolved configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub credentials: Credentials,
    pub launch_attempts: u32,
    pub launch_base_delay: Duration,
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    pub output_dir: PathBuf,
    pub save_url_file: bool,
    pub upload_latest: bool,
}

impl Config {
    /// Combine CLI tunables with credentials from the environment.
    pub fn load(cli: Cli) -> Result<Self, ConfigError> {
        let credentials = Credentials::from_env()?;
        let config = Self::assemble(cli, credentials)?;
        Ok(config)
    }

    /// Combine CLI tunables with an already-parsed credential blob.
    pub fn assemble(cli: Cli, credentials: Credentials) -> Result<Self, ConfigError> {
        if cli.launch_attempts == 0 {
            return Err(ConfigError::ZeroTunable("launch-attempts"));
        }
        if cli.launch_base_delay_secs == 0 {
            return Err(ConfigError::ZeroTunable("launch-base-delay-secs"));
        }
        if cli.poll_attempts == 0 {
            return Err(ConfigError::ZeroTunable("poll-attempts"));
        }
        if cli.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroTunable("poll-interval-secs"));
        }

        Ok(Self {
            api_url: cli.api_url,
            credentials,
            launch_attempts: cli.launch_attempts,
            launch_base_delay: Duration::from_secs(cli.launch_base_delay_secs),
            poll_attempts: cli.poll_attempts,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            output_dir: cli.output_dir,
            save_url_file: cli.save_url_file,
            upload_latest: cli.upload_latest,
        })
    }
}
