//! Run orchestration
//!
//! One run moves through Launching, Polling, Extracting and
//! Persisting in order; a failure at any stage aborts the run and no
//! stage is retried here (retry lives inside the launcher and
//! poller). A [`RunOutcome`] exists only if every stage completed, so
//! a partially persisted run is never reported as done.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use harvest_client::AgentApi;
use harvest_core::{RunOutcome, extract_references};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::config::Config;
use crate::launcher::{LaunchError, launch_with_backoff};
use crate::poller::{PollError, poll_until_ready};
use crate::storage::{ObjectStore, StorageError};

/// S3 key prefix for uploaded output documents.
const UPLOAD_PREFIX: &str = "agent-outputs";

/// Stage a run failure occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Launching,
    Polling,
    Extracting,
    Persisting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Launching => "launch",
            Stage::Polling => "poll",
            Stage::Extracting => "extract",
            Stage::Persisting => "persist",
        };
        f.write_str(name)
    }
}

/// Run-level errors, each tied to the stage it aborts
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Poll(#[from] PollError),

    /// The output was ready but carried no URL of a mandatory kind
    #[error("no {0} artifact URL found in agent output")]
    MissingArtifact(&'static str),

    #[error("failed to encode raw output: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {}: {cause}", .path.display())]
    LocalWrite {
        path: PathBuf,
        cause: std::io::Error,
    },

    #[error(transparent)]
    Upload(#[from] StorageError),
}

impl RunError {
    /// Stage this error aborted the run in.
    pub fn stage(&self) -> Stage {
        match self {
            RunError::Launch(_) => Stage::Launching,
            RunError::Poll(_) => Stage::Polling,
            RunError::MissingArtifact(_) => Stage::Extracting,
            RunError::Encode(_) | RunError::LocalWrite { .. } | RunError::Upload(_) => {
                Stage::Persisting
            }
        }
    }
}

/// Drive one agent run end to end.
///
/// Launch (with backoff), poll until the output is ready, extract
/// artifact references (JSON mandatory, CSV optional), write the raw
/// output locally, upload it, and return the outcome record.
pub async fn run(
    config: &Config,
    api: &dyn AgentApi,
    store: &dyn ObjectStore,
) -> Result<RunOutcome, RunError> {
    let agent_id = &config.credentials.agent_id;

    info!(agent_id = %agent_id, "launching agent");
    let container_id = launch_with_backoff(
        api,
        agent_id,
        config.launch_attempts,
        config.launch_base_delay,
    )
    .await?;

    let raw = poll_until_ready(
        api,
        &container_id,
        config.poll_attempts,
        config.poll_interval,
    )
    .await?;

    let references = extract_references(raw.get("output").unwrap_or(&Value::Null));
    let json_ref = references
        .json
        .clone()
        .ok_or(RunError::MissingArtifact("json"))?;
    info!(url = %json_ref.url, "json artifact found");
    match &references.csv {
        Some(csv) => info!(url = %csv.url, "csv artifact found"),
        None => debug!("no csv artifact in output; csv is optional"),
    }

    let file_name = output_file_name(Utc::now());
    let bytes = serde_json::to_vec_pretty(&raw)?;

    let local_path = config.output_dir.join(&file_name);
    write_file(&local_path, &bytes).await?;
    info!(path = %local_path.display(), "raw output saved locally");

    if config.save_url_file {
        let url_path = config.output_dir.join("latest_result_url.txt");
        write_file(&url_path, json_ref.url.as_bytes()).await?;
    }

    if config.upload_latest {
        store
            .put(
                &format!("{UPLOAD_PREFIX}/latest.json"),
                bytes.clone(),
                "application/json",
            )
            .await?;
    }

    let key = format!("{UPLOAD_PREFIX}/{file_name}");
    let upload_location = store.put(&key, bytes, "application/json").await?;

    Ok(RunOutcome {
        raw_output: raw,
        references,
        local_path,
        upload_location,
    })
}

/// Timestamp-derived name, unique per run at second granularity.
fn output_file_name(now: DateTime<Utc>) -> String {
    format!("agent_output_{}.json", now.format("%Y-%m-%dT%H-%M-%S"))
}

async fn write_file(path: &PathBuf, bytes: &[u8]) -> Result<(), RunError> {
    fs::write(path, bytes)
        .await
        .map_err(|cause| RunError::LocalWrite {
            path: path.clone(),
            cause,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cli, Config, Credentials};
    use crate::testutil::{MemoryStore, ScriptedAgent};
    use clap::Parser;
    use harvest_client::ClientError;
    use serde_json::json;

    fn test_config(dir: &std::path::Path, extra_flags: &[&str]) -> Config {
        let creds = Credentials::parse(
            r#"{
                "apiKey": "pk-123",
                "agentId": "4567",
                "accessKeyId": "AKIATEST",
                "secretAccessKey": "secret",
                "region": "eu-west-1",
                "bucketName": "harvest-results"
            }"#,
        )
        .unwrap();

        let mut args = vec!["harvest", "--output-dir"];
        let dir_str = dir.to_str().unwrap();
        args.push(dir_str);
        args.extend_from_slice(extra_flags);

        Config::assemble(Cli::parse_from(args), creds).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_happy_path_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &[]);
        let api = ScriptedAgent::new().launch_ok("c-1").output_ok(json!({
            "status": "finished",
            "output": "result at https://x/a.json and https://x/b.csv"
        }));
        let store = MemoryStore::new();

        let outcome = run(&config, &api, &store).await.unwrap();

        assert_eq!(api.launch_calls(), 1);
        assert_eq!(api.fetch_calls(), 1);
        assert_eq!(
            outcome.references.json.as_ref().unwrap().url,
            "https://x/a.json"
        );
        assert!(outcome.upload_location.starts_with("s3://test-bucket/agent-outputs/"));

        // local copy holds the full response verbatim
        let written = std::fs::read(&outcome.local_path).unwrap();
        let reparsed: Value = serde_json::from_slice(&written).unwrap();
        assert_eq!(reparsed, outcome.raw_output);

        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("agent-outputs/agent_output_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_json_artifact_fails_without_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &[]);
        let api = ScriptedAgent::new()
            .launch_ok("c-1")
            .output_ok(json!({"output": "only https://x/b.csv here"}));
        let store = MemoryStore::new();

        let err = run(&config, &api, &store).await.unwrap_err();

        assert!(matches!(err, RunError::MissingArtifact("json")));
        assert_eq!(err.stage(), Stage::Extracting);
        assert!(store.keys().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_failure_aborts_in_persist_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &[]);
        let api = ScriptedAgent::new()
            .launch_ok("c-1")
            .output_ok(json!({"output": ["https://x/a.json"]}));
        let store = MemoryStore::failing();

        let err = run(&config, &api, &store).await.unwrap_err();

        assert!(matches!(err, RunError::Upload(_)));
        assert_eq!(err.stage(), Stage::Persisting);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_url_file_writes_json_url() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &["--save-url-file"]);
        let api = ScriptedAgent::new()
            .launch_ok("c-1")
            .output_ok(json!({"output": ["https://x/a.json"]}));
        let store = MemoryStore::new();

        run(&config, &api, &store).await.unwrap();

        let url = std::fs::read_to_string(dir.path().join("latest_result_url.txt")).unwrap();
        assert_eq!(url, "https://x/a.json");
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_latest_adds_stable_key() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &["--upload-latest"]);
        let api = ScriptedAgent::new()
            .launch_ok("c-1")
            .output_ok(json!({"output": ["https://x/a.json"]}));
        let store = MemoryStore::new();

        let outcome = run(&config, &api, &store).await.unwrap();

        let keys = store.keys();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0], "agent-outputs/latest.json");
        assert!(outcome.upload_location.contains("agent_output_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_maps_to_launch_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), &[]);
        let api = ScriptedAgent::new().launch_err(ClientError::api_error(500, "boom"));
        let store = MemoryStore::new();

        let err = run(&config, &api, &store).await.unwrap_err();

        assert_eq!(err.stage(), Stage::Launching);
        assert_eq!(api.fetch_calls(), 0);
    }

    #[test]
    fn test_output_file_name_is_timestamp_derived() {
        let when = DateTime::parse_from_rfc3339("2024-03-02T10:11:12Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            output_file_name(when),
            "agent_output_2024-03-02T10-11-12.json"
        );
    }
}
