/// Failure of a single request to the backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Missing or rejected credential. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// The backend refused the payload. Never retried.
    #[error("bad request ({status:?}): {message}")]
    BadRequest { status: Option<u16>, message: String },
    /// Network failure, timeout or 5xx.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

impl BackendError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BackendError::Unreachable(_))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Unreachable(e.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PollError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("polling cancelled")]
    Cancelled,
}

/// Why a session refused a submission. History is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a request is already in flight")]
    Busy,
    #[error("session is not open")]
    NotOpen,
    #[error("nothing to send")]
    EmptyInput,
}
