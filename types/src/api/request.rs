use crate::audio::Base64EncodedAudioBytes;
use crate::job::JobKind;

/// Body of the `run` request. The backend expects the job payload wrapped in `input`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SubmitRequest {
    input: JobInput,
}

impl SubmitRequest {
    pub fn new(input: JobInput) -> Self {
        Self { input }
    }

    pub fn input(&self) -> &JobInput {
        &self.input
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobInput {
    /// "text" or "audio"
    #[serde(rename = "type")]
    kind: JobKind,

    /// The typed message, for "text" jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,

    /// The recorded clip with its data-URI prefix stripped, for "audio" jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<Base64EncodedAudioBytes>,
}

impl JobInput {
    pub fn new_text(text: &str) -> Self {
        Self {
            kind: JobKind::Text,
            text: Some(text.to_string()),
            audio: None,
        }
    }

    pub fn new_audio(audio: Base64EncodedAudioBytes) -> Self {
        Self {
            kind: JobKind::Audio,
            text: None,
            audio: Some(audio),
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn audio(&self) -> Option<&Base64EncodedAudioBytes> {
        self.audio.as_ref()
    }
}
