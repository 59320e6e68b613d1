//! Exponential-backoff status polling for submitted generation jobs.
//!
//! [`poll_job`] keeps checking a job with increasing delays until it
//! finishes, the attempt budget runs out, or the [`CancellationToken`] is
//! triggered. On cancellation the remote job is aborted on a best-effort
//! basis.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::api::GenerationApi;
use crate::backend::GeneratedMedia;
use crate::error::BackendError;

/// Upper bound on the best-effort remote cancel call.
pub const REMOTE_CANCEL_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunable parameters for the polling backoff.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the first status check.
    pub initial_delay: Duration,
    /// Upper bound on the delay between checks.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each check.
    pub multiplier: f64,
    /// Status checks allowed before the job is declared timed out.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(15),
            multiplier: 1.5,
            max_attempts: 120,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`PollConfig::max_delay`].
pub fn next_delay(current: Duration, config: &PollConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Poll `job_id` until it completes.
pub async fn poll_job(
    api: &GenerationApi,
    job_id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<GeneratedMedia, BackendError> {
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        // Wait before checking, respecting cancellation.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort_remote(api, job_id).await;
                return Err(BackendError::Cancelled);
            }
            _ = tokio::time::sleep(delay) => {}
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                abort_remote(api, job_id).await;
                return Err(BackendError::Cancelled);
            }
            result = api.status(job_id) => result?,
        };

        if status.status.is_finished() {
            tracing::debug!(job_id, attempt, state = ?status.status, "Generation job finished");
            return status.into_media();
        }

        tracing::trace!(job_id, attempt, state = ?status.status, "Generation job still running");
        delay = next_delay(delay, config);
    }

    tracing::warn!(job_id, attempts = config.max_attempts, "Generation job poll budget exhausted");
    abort_remote(api, job_id).await;
    Err(BackendError::Timeout {
        attempts: config.max_attempts,
    })
}

async fn abort_remote(api: &GenerationApi, job_id: &str) {
    match tokio::time::timeout(REMOTE_CANCEL_TIMEOUT, api.cancel(job_id)).await {
        Ok(Ok(())) => tracing::info!(job_id, "Remote generation job cancelled"),
        Ok(Err(e)) => tracing::warn!(job_id, error = %e, "Remote cancel failed"),
        Err(_) => tracing::warn!(job_id, "Remote cancel timed out"),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn next_delay_grows_by_multiplier() {
        let config = PollConfig::default();
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(3));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = PollConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(8), &config);
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn full_backoff_sequence() {
        let config = PollConfig {
            multiplier: 2.0,
            ..Default::default()
        };
        let mut delay = config.initial_delay;
        let expected = [2, 4, 8, 15, 15];

        for &expected_secs in &expected {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancellation_token_stops_polling() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        // Nothing listens on the discard port; the remote cancel fails and
        // is only logged.
        let api = GenerationApi::new("http://127.0.0.1:9", None);
        let result = poll_job(&api, "job-1", &PollConfig::default(), &cancel).await;
        assert_matches!(result, Err(BackendError::Cancelled));
    }

    #[tokio::test]
    async fn zero_attempt_budget_times_out() {
        let api = GenerationApi::new("http://127.0.0.1:9", None);
        let config = PollConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let result = poll_job(&api, "job-1", &config, &CancellationToken::new()).await;
        assert_matches!(result, Err(BackendError::Timeout { attempts: 0 }));
    }
}
