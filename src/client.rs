use crate::error::BackendError;
use crate::types::api::{JobInput, StatusResponse, SubmitRequest, SubmitResponse};
use crate::types::audio::Base64EncodedAudioBytes;
use crate::types::{Job, JobId, JobKind};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use std::sync::{Arc, Mutex};

pub(crate) mod config;
pub(crate) mod consts;
mod stats;
mod utils;

pub use config::{Config, ConfigBuilder, ConfigError};
pub use stats::Stats;

/// What a job asks the backend to do. Exactly one input is carried, matching the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    Text(String),
    /// Transport string produced by the media codec
    Audio(Base64EncodedAudioBytes),
}

impl JobPayload {
    pub fn kind(&self) -> JobKind {
        match self {
            JobPayload::Text(_) => JobKind::Text,
            JobPayload::Audio(_) => JobKind::Audio,
        }
    }

    fn into_input(self) -> Result<JobInput, BackendError> {
        match self {
            JobPayload::Text(text) if text.trim().is_empty() => Err(empty_payload("text")),
            JobPayload::Audio(audio) if audio.is_empty() => Err(empty_payload("audio")),
            JobPayload::Text(text) => Ok(JobInput::new_text(&text)),
            JobPayload::Audio(audio) => Ok(JobInput::new_audio(audio)),
        }
    }
}

fn empty_payload(field: &str) -> BackendError {
    BackendError::BadRequest {
        status: None,
        message: format!("{field} payload is empty"),
    }
}

/// Receipt for a submitted job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobHandle {
    id: JobId,
    kind: JobKind,
}

impl JobHandle {
    pub fn new(id: JobId, kind: JobKind) -> Self {
        Self { id, kind }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn into_job(self) -> Job {
        Job::new(self.id, self.kind)
    }
}

/// The submit/status contract of a queue-based inference backend.
///
/// Implementations issue exactly one request per call and never retry.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn submit(&self, payload: JobPayload) -> Result<JobHandle, BackendError>;

    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, BackendError>;
}

/// HTTP client for a RunPod serverless endpoint.
pub struct Client {
    http: reqwest::Client,
    config: Config,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            http,
            config,
            stats: Arc::new(Mutex::new(Stats::new())),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // Return a snapshot of the request counters.
    pub fn stats(&self) -> Stats {
        match self.stats.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update_stats(&self, update: impl FnOnce(&mut Stats)) {
        if let Ok(mut stats_guard) = self.stats.lock() {
            update(&mut stats_guard);
        } else {
            tracing::error!("failed to update stats");
        }
    }
}

#[async_trait]
impl JobBackend for Client {
    async fn submit(&self, payload: JobPayload) -> Result<JobHandle, BackendError> {
        let kind = payload.kind();
        let body = SubmitRequest::new(payload.into_input()?);

        let request = utils::authorize(self.http.post(utils::run_url(&self.config)), &self.config)?;
        let response = request.json(&body).send().await?;
        tracing::debug!("submit response status: {}", response.status());

        let submitted: SubmitResponse = utils::read_json(response).await.map_err(|e| {
            tracing::error!("job submission failed: {}", e);
            e
        })?;
        self.update_stats(Stats::record_submission);
        tracing::info!("submitted {:?} job {}", kind, submitted.id());
        Ok(JobHandle::new(submitted.id().clone(), kind))
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, BackendError> {
        self.update_stats(Stats::record_status_check);
        let request =
            utils::authorize(self.http.get(utils::status_url(&self.config, job_id)), &self.config)?;

        let result = match request.send().await {
            Ok(response) => utils::read_json::<StatusResponse>(response).await,
            Err(e) => Err(e.into()),
        };
        if let Err(ref e) = result {
            if e.is_retryable() {
                self.update_stats(Stats::record_transient_failure);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendStatus;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> Client {
        let config = Config::builder()
            .with_base_url(&server.uri())
            .with_endpoint_id("ep1")
            .with_api_key("rp_key")
            .build();
        Client::new(config).unwrap()
    }

    #[tokio::test]
    async fn submit_text_returns_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ep1/run"))
            .and(header("authorization", "Bearer rp_key"))
            .and(body_json(serde_json::json!({"input": {"type": "text", "text": "Hello"}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "job-1", "status": "IN_QUEUE"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let handle = client
            .submit(JobPayload::Text("Hello".to_string()))
            .await
            .unwrap();
        assert_eq!(handle.id().as_str(), "job-1");
        assert_eq!(handle.kind(), JobKind::Text);
        assert_eq!(client.stats().jobs_submitted(), 1);
    }

    #[tokio::test]
    async fn submit_audio_sends_transport_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ep1/run"))
            .and(body_json(serde_json::json!({"input": {"type": "audio", "audio": "UklGRg=="}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "job-2"})))
            .mount(&server)
            .await;

        let handle = client_for(&server)
            .submit(JobPayload::Audio("UklGRg==".to_string()))
            .await
            .unwrap();
        assert_eq!(handle.kind(), JobKind::Audio);
    }

    #[tokio::test]
    async fn submit_classifies_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ep1/run"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": {"message": "bad key"}})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit(JobPayload::Text("Hello".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth(ref m) if m == "bad key"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn submit_server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit(JobPayload::Text("Hello".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn missing_key_is_auth_error_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = Config::builder()
            .with_base_url(&server.uri())
            .with_endpoint_id("ep1")
            .build();
        let err = Client::new(config)
            .unwrap()
            .submit(JobPayload::Text("Hello".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth(_)));
    }

    #[tokio::test]
    async fn empty_payload_is_rejected_locally() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .submit(JobPayload::Text("   ".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::BadRequest { status: None, .. }));
    }

    #[tokio::test]
    async fn status_parses_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ep1/status/job-1"))
            .and(header("authorization", "Bearer rp_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "job-1",
                "status": "COMPLETED",
                "output": {"assistant_response": {"text": "Hi there"}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let response = client.status(&JobId::new("job-1")).await.unwrap();
        assert_eq!(response.status(), &BackendStatus::Completed);
        assert_eq!(
            response.output().unwrap().assistant_response().unwrap().text(),
            "Hi there"
        );
        assert_eq!(client.stats().status_checks(), 1);
    }

    #[tokio::test]
    async fn status_server_error_counts_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.status(&JobId::new("job-1")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(client.stats().transient_failures(), 1);
    }
}
