//! Agent launch with rate-limit backoff
//!
//! The platform rate-limits launch requests aggressively. Only a 429
//! is retried, with a doubling delay; any other failure is final and
//! surfaces immediately.

use std::time::Duration;

use harvest_client::AgentApi;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{info, warn};

/// Launch errors, both fatal for the run
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Non-retryable launch failure (API error, missing handle)
    #[error("launch failed: {0}")]
    Failed(String),

    /// Retry budget spent on rate limiting
    #[error("rate limited on all {attempts} launch attempts")]
    Exhausted { attempts: u32 },
}

/// Launch one agent run, retrying on rate limiting only.
///
/// Delay before retry `k` is `base_delay * 2^(k-1)`; the final
/// attempt's rejection is reported without a trailing sleep. A
/// successful response without a container id is a failed launch.
pub async fn launch_with_backoff(
    api: &dyn AgentApi,
    agent_id: &str,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<String, LaunchError> {
    let mut delay = base_delay;

    for attempt in 1..=max_attempts {
        match api.launch_agent(agent_id).await {
            Ok(response) => {
                let container_id = response
                    .container_id
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| {
                        LaunchError::Failed("missing container id in launch response".to_string())
                    })?;
                info!(agent_id, container_id = %container_id, "agent launched");
                return Ok(container_id);
            }
            Err(e) if e.is_rate_limited() => {
                if attempt == max_attempts {
                    break;
                }
                warn!(
                    "Rate limit hit on launch (attempt {}/{}), retrying in {:?}",
                    attempt, max_attempts, delay
                );
                sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(LaunchError::Failed(e.to_string())),
        }
    }

    Err(LaunchError::Exhausted {
        attempts: max_attempts,
    })
}
