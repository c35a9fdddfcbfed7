pub mod error;

use crate::audio::Base64EncodedAudioBytes;
use crate::job::{BackendStatus, JobId};

/// Response to a successful `run` request.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubmitResponse {
    id: JobId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<BackendStatus>,
}

impl SubmitResponse {
    pub fn new(id: JobId) -> Self {
        Self { id, status: None }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> Option<&BackendStatus> {
        self.status.as_ref()
    }
}

/// Response of the `status/{id}` endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StatusResponse {
    id: JobId,
    status: BackendStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<JobOutput>,
    /// Failure reason, present when `status` is "FAILED"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl StatusResponse {
    pub fn new(id: JobId, status: BackendStatus) -> Self {
        Self {
            id,
            status,
            output: None,
            error: None,
        }
    }

    pub fn with_output(mut self, output: JobOutput) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> &BackendStatus {
        &self.status
    }

    pub fn output(&self) -> Option<&JobOutput> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_output(self) -> Option<JobOutput> {
        self.output
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobOutput {
    /// What the backend heard, echoed back for audio jobs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_input: Option<UserInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assistant_response: Option<AssistantResponse>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_input(mut self, text: &str) -> Self {
        self.user_input = Some(UserInput {
            text: text.to_string(),
        });
        self
    }

    pub fn with_assistant_response(mut self, response: AssistantResponse) -> Self {
        self.assistant_response = Some(response);
        self
    }

    pub fn user_input(&self) -> Option<&UserInput> {
        self.user_input.as_ref()
    }

    pub fn assistant_response(&self) -> Option<&AssistantResponse> {
        self.assistant_response.as_ref()
    }
}

// Handlers sometimes send `"text": null` instead of omitting the field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(text.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserInput {
    #[serde(default, deserialize_with = "null_as_empty")]
    text: String,
}

impl UserInput {
    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AssistantResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    text: String,
    /// Spoken reply as base64 WAV
    #[serde(default, skip_serializing_if = "Option::is_none")]
    audio: Option<Base64EncodedAudioBytes>,
}

impl AssistantResponse {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            audio: None,
        }
    }

    pub fn with_audio(mut self, audio: Base64EncodedAudioBytes) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> Option<&Base64EncodedAudioBytes> {
        self.audio.as_ref()
    }
}
