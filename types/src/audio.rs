use std::sync::Arc;

/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// Opaque handle to the encoded audio attached to a message.
///
/// Cloning is cheap; the transport string is shared, never copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRef(Arc<str>);

impl AudioRef {
    pub fn new(audio: Base64EncodedAudioBytes) -> Self {
        Self(Arc::from(audio))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Base64EncodedAudioBytes> for AudioRef {
    fn from(audio: Base64EncodedAudioBytes) -> Self {
        Self::new(audio)
    }
}
