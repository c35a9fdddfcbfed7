use crate::client::consts::{
    BASE_URL, DEFAULT_GREETING, DEFAULT_REQUEST_TIMEOUT_SECS, RUNPOD_API_KEY, RUNPOD_BASE_URL,
    RUNPOD_ENDPOINT_ID,
};
use crate::poller::BackoffPolicy;
use secrecy::SecretString;
use std::env;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Everything the client needs to reach one serverless endpoint.
#[derive(Debug)]
pub struct Config {
    base_url: String,
    endpoint_id: String,
    api_key: SecretString,
    request_timeout: Duration,
    poll: BackoffPolicy,
    greeting: String,
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_endpoint_id(mut self, endpoint_id: &str) -> Self {
        self.config.endpoint_id = endpoint_id.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn with_poll_policy(mut self, policy: BackoffPolicy) -> Self {
        self.config.poll = policy;
        self
    }

    pub fn with_greeting(mut self, greeting: &str) -> Self {
        self.config.greeting = greeting.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults with no endpoint and an empty key. Nothing is read from the
    /// environment here; use [`Config::from_env`] for that.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            endpoint_id: String::new(),
            api_key: SecretString::from(String::new()),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll: BackoffPolicy::default(),
            greeting: DEFAULT_GREETING.to_string(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Loads configuration from environment variables.
    ///
    // *   `RUNPOD_API_KEY`: bearer credential for the endpoint. Required.
    // *   `RUNPOD_ENDPOINT_ID`: serverless endpoint to submit jobs to. Required.
    // *   `RUNPOD_BASE_URL`: (Optional) API root. Defaults to "https://api.runpod.ai/v2".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is ignored if not present.
        dotenvy::dotenv().ok();

        let api_key = env::var(RUNPOD_API_KEY)
            .map_err(|_| ConfigError::MissingVar(RUNPOD_API_KEY.to_string()))?;
        let endpoint_id = env::var(RUNPOD_ENDPOINT_ID)
            .map_err(|_| ConfigError::MissingVar(RUNPOD_ENDPOINT_ID.to_string()))?;
        let base_url = env::var(RUNPOD_BASE_URL).unwrap_or_else(|_| BASE_URL.to_string());

        Ok(Self::builder()
            .with_base_url(&base_url)
            .with_endpoint_id(&endpoint_id)
            .with_api_key(&api_key)
            .build())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_id(&self) -> &str {
        &self.endpoint_id
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn poll_policy(&self) -> BackoffPolicy {
        self.poll
    }

    pub fn greeting(&self) -> &str {
        &self.greeting
    }
}
