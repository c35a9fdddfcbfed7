use crate::client::JobBackend;
use crate::error::PollError;
use crate::types::api::JobOutput;
use crate::types::{BackendStatus, Job, JobStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod backoff;

pub use backoff::BackoffPolicy;

/// Terminal result of polling one job.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(JobOutput),
    /// The backend reported FAILED; `reason` is its error text, untouched.
    Failed { reason: Option<String> },
    /// The attempt budget ran out without a terminal backend status.
    TimedOut { attempts: u32 },
}

/// Polls the status endpoint until a job reaches a terminal state.
pub struct Poller<B: ?Sized> {
    backend: Arc<B>,
    policy: BackoffPolicy,
}

impl<B: ?Sized> Clone for Poller<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            policy: self.policy,
        }
    }
}

impl<B: JobBackend + ?Sized> Poller<B> {
    pub fn new(backend: Arc<B>, policy: BackoffPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Polls `job` until COMPLETED or FAILED, the attempt budget is spent, or
    /// `cancel` fires.
    ///
    /// Transient errors and non-terminal statuses both consume an attempt.
    /// Auth and bad-request errors end polling at once. Status strings this
    /// client does not recognise are treated as still running.
    pub async fn poll(
        &self,
        job: &mut Job,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome, PollError> {
        let max_attempts = self.policy.max_attempts();
        tracing::info!("polling for job completion. job id: {}", job.id());

        for attempt in 0..max_attempts {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                result = self.backend.status(job.id()) => result,
            };

            match result {
                Ok(response) => match response.status().clone() {
                    BackendStatus::Completed => {
                        job.advance(JobStatus::Completed);
                        tracing::info!("job {} completed after {} attempt(s)", job.id(), attempt + 1);
                        return Ok(PollOutcome::Completed(response.into_output().unwrap_or_default()));
                    }
                    BackendStatus::Failed => {
                        job.advance(JobStatus::Failed);
                        tracing::warn!("job {} failed: {:?}", job.id(), response.error());
                        return Ok(PollOutcome::Failed {
                            reason: response.error().map(str::to_string),
                        });
                    }
                    BackendStatus::Unknown(status) => {
                        tracing::warn!("job {} reported unrecognised status {}, still polling", job.id(), status);
                    }
                    status => {
                        if let Some(next) = status.job_status() {
                            job.advance(next);
                        }
                        tracing::debug!("attempt {}: job {} is {}", attempt + 1, job.id(), status.as_str());
                    }
                },
                Err(e) if e.is_retryable() => {
                    tracing::warn!("attempt {}: transient error polling job {}: {}", attempt + 1, job.id(), e);
                }
                Err(e) => {
                    job.advance(JobStatus::Failed);
                    tracing::error!("giving up on job {}: {}", job.id(), e);
                    return Err(PollError::Backend(e));
                }
            }

            if attempt + 1 < max_attempts {
                let delay = self.policy.delay(attempt);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(PollError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        job.advance(JobStatus::TimedOut);
        tracing::warn!("job {} timed out after {} attempts", job.id(), max_attempts);
        Ok(PollOutcome::TimedOut {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockJobBackend;
    use crate::error::BackendError;
    use crate::types::api::{AssistantResponse, StatusResponse};
    use crate::types::{JobId, JobKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    fn response(status: BackendStatus) -> StatusResponse {
        StatusResponse::new(JobId::new("job-1"), status)
    }

    fn job() -> Job {
        Job::new(JobId::new("job-1"), JobKind::Text)
    }

    fn policy(max_attempts: u32) -> BackoffPolicy {
        BackoffPolicy::new(Duration::from_millis(100), 2.0, Duration::from_millis(400), max_attempts)
    }

    #[tokio::test]
    async fn completed_on_first_poll() {
        let mut backend = MockJobBackend::new();
        backend.expect_status().times(1).returning(|_| {
            let output = JobOutput::new().with_assistant_response(AssistantResponse::new("Hi there"));
            Ok(response(BackendStatus::Completed).with_output(output))
        });

        let poller = Poller::new(Arc::new(backend), policy(5));
        let mut job = job();
        let outcome = poller.poll(&mut job, &CancellationToken::new()).await.unwrap();

        match outcome {
            PollOutcome::Completed(output) => {
                assert_eq!(output.assistant_response().unwrap().text(), "Hi there")
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(job.status(), JobStatus::Completed);
    }

    #[tokio::test]
    async fn failed_on_first_check_returns_immediately() {
        let mut backend = MockJobBackend::new();
        backend
            .expect_status()
            .times(1)
            .returning(|_| Ok(response(BackendStatus::Failed).with_error("handler crashed: KeyError 'audio'")));

        let poller = Poller::new(Arc::new(backend), policy(5));
        let mut job = job();
        let outcome = poller.poll(&mut job, &CancellationToken::new()).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::Failed {
                reason: Some("handler crashed: KeyError 'audio'".to_string())
            }
        );
        assert_eq!(job.status(), JobStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn never_terminal_times_out_within_budget() {
        let mut backend = MockJobBackend::new();
        backend
            .expect_status()
            .times(4)
            .returning(|_| Ok(response(BackendStatus::Processing)));

        let poller = Poller::new(Arc::new(backend), policy(4));
        let mut job = job();
        let started = Instant::now();
        let outcome = poller.poll(&mut job, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 4 });
        assert_eq!(job.status(), JobStatus::TimedOut);
        // 100 + 200 + 400, no wait after the last attempt
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(720), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_share_the_attempt_budget() {
        let mut backend = MockJobBackend::new();
        backend
            .expect_status()
            .times(3)
            .returning(|_| Err(BackendError::Unreachable("connection reset".to_string())));

        let poller = Poller::new(Arc::new(backend), policy(3));
        let outcome = poller.poll(&mut job(), &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 3 });
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut backend = MockJobBackend::new();
        backend.expect_status().returning(move |_| match counter.fetch_add(1, Ordering::SeqCst) {
            0 => Err(BackendError::Unreachable("502".to_string())),
            1 => Ok(response(BackendStatus::InQueue)),
            2 => Ok(response(BackendStatus::Unknown("WARMING_UP".to_string()))),
            _ => Ok(response(BackendStatus::Completed)),
        });

        let poller = Poller::new(Arc::new(backend), policy(10));
        let mut job = job();
        let outcome = poller.poll(&mut job, &CancellationToken::new()).await.unwrap();

        assert_eq!(outcome, PollOutcome::Completed(JobOutput::new()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn auth_error_stops_polling() {
        let mut backend = MockJobBackend::new();
        backend
            .expect_status()
            .times(1)
            .returning(|_| Err(BackendError::Auth("token revoked".to_string())));

        let poller = Poller::new(Arc::new(backend), policy(10));
        let err = poller.poll(&mut job(), &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PollError::Backend(BackendError::Auth(_))));
    }

    #[tokio::test]
    async fn cancelled_token_issues_no_request() {
        let mut backend = MockJobBackend::new();
        backend.expect_status().times(0);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let poller = Poller::new(Arc::new(backend), policy(10));
        let err = poller.poll(&mut job(), &cancel).await.unwrap_err();
        assert!(matches!(err, PollError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_backoff_stops_polling() {
        let mut backend = MockJobBackend::new();
        backend
            .expect_status()
            .times(1)
            .returning(|_| Ok(response(BackendStatus::InQueue)));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let poller = Poller::new(Arc::new(backend), policy(10));
        let err = poller.poll(&mut job(), &cancel).await.unwrap_err();
        assert!(matches!(err, PollError::Cancelled));
    }
}
