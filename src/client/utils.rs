use crate::client::config::Config;
use crate::error::BackendError;
use crate::types::api::ErrorBody;
use crate::types::JobId;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

pub fn run_url(config: &Config) -> String {
    format!("{}/{}/run", config.base_url(), config.endpoint_id())
}

pub fn status_url(config: &Config, job_id: &JobId) -> String {
    format!("{}/{}/status/{}", config.base_url(), config.endpoint_id(), job_id)
}

/// Attaches the bearer credential. A missing key is an auth failure, not a
/// reason to send an anonymous request.
pub fn authorize(request: RequestBuilder, config: &Config) -> Result<RequestBuilder, BackendError> {
    let api_key = config.api_key().expose_secret();
    if api_key.trim().is_empty() {
        return Err(BackendError::Auth("no api key configured".to_string()));
    }
    Ok(request.bearer_auth(api_key))
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(classify_status(status, &body));
    }
    serde_json::from_str(&body).map_err(|e| BackendError::BadRequest {
        status: Some(status.as_u16()),
        message: format!("unexpected response body: {e}"),
    })
}

pub fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|body| body.message().to_string())
        .unwrap_or_else(|_| format!("Unexpected error ({})", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Auth(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            BackendError::Unreachable(message)
        }
        s if s.is_server_error() => BackendError::Unreachable(message),
        s => BackendError::BadRequest {
            status: Some(s.as_u16()),
            message,
        },
    }
}
