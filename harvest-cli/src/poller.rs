//! Output polling
//!
//! Fetches the container's output document on a fixed interval until
//! the readiness predicate holds or the attempt budget runs out. A
//! failed fetch is transient: it consumes an attempt and polling
//! continues. The interval is deliberately flat, unlike the
//! launcher's backoff; the platform does not penalize status polls.

use std::time::Duration;

use harvest_client::AgentApi;
use harvest_core::{PollResult, RawOutput, output_ready};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Polling errors
#[derive(Debug, Error)]
pub enum PollError {
    /// Output never became ready within the attempt budget
    #[error("output not ready after {attempts} poll attempts")]
    Timeout { attempts: u32 },
}

/// Classify one fetch into a poll result.
async fn poll_once(api: &dyn AgentApi, container_id: &str) -> PollResult {
    match api.fetch_output(container_id).await {
        Ok(raw) if output_ready(&raw) => PollResult::Ready(raw),
        Ok(_) => PollResult::Pending,
        Err(e) => PollResult::TransientError(e.to_string()),
    }
}

/// Poll until the output document is ready.
///
/// The first fetch happens immediately; one `interval` sleep
/// separates subsequent attempts, so readiness on attempt N costs
/// exactly N-1 sleeps. Returns the full response verbatim so the
/// caller can persist it exactly as received. Never issues more than
/// `max_attempts` fetches; transient errors do not reset the count.
pub async fn poll_until_ready(
    api: &dyn AgentApi,
    container_id: &str,
    max_attempts: u32,
    interval: Duration,
) -> Result<RawOutput, PollError> {
    for attempt in 1..=max_attempts {
        match poll_once(api, container_id).await {
            PollResult::Ready(raw) => {
                info!(container_id, attempt, "output ready");
                return Ok(raw);
            }
            PollResult::Pending => {
                debug!(
                    "Output not ready yet (attempt {}/{})",
                    attempt, max_attempts
                );
            }
            PollResult::TransientError(cause) => {
                warn!(
                    "Transient fetch error (attempt {}/{}): {}",
                    attempt, max_attempts, cause
                );
            }
        }

        if attempt < max_attempts {
            sleep(interval).await;
        }
    }

    Err(PollError::Timeout {
        attempts: max_attempts,
    })
}
