/// Error body returned with a 4xx/5xx status.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    error: ErrorPayload,
}

/// The backend sends either `{"error": {"message": ...}}` or a bare string.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ErrorPayload {
    Details { message: String },
    Message(String),
}

impl ErrorBody {
    pub fn new(message: &str) -> Self {
        Self {
            error: ErrorPayload::Details {
                message: message.to_string(),
            },
        }
    }

    pub fn message(&self) -> &str {
        match &self.error {
            ErrorPayload::Details { message } => message,
            ErrorPayload::Message(message) => message,
        }
    }
}
