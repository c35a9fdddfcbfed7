use crate::audio::AudioRef;

/// One entry in a conversation's history. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Who the entry is attributed to: "user", "assistant", "system" or "error"
    role: MessageRole,

    /// The rendered text of the entry
    text: String,

    /// Spoken version of the entry, for assistant replies that carried audio
    audio: Option<AudioRef>,
}

impl Message {
    pub fn builder() -> MessageBuilder {
        MessageBuilder::new()
    }

    pub fn user(text: &str) -> Self {
        Self::builder().with_role(MessageRole::User).with_text(text).build()
    }

    pub fn assistant(text: &str) -> Self {
        Self::builder().with_role(MessageRole::Assistant).with_text(text).build()
    }

    pub fn system(text: &str) -> Self {
        Self::builder().with_role(MessageRole::System).with_text(text).build()
    }

    pub fn error(text: &str) -> Self {
        Self::builder().with_role(MessageRole::Error).with_text(text).build()
    }

    pub fn role(&self) -> MessageRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> Option<&AudioRef> {
        self.audio.as_ref()
    }
}

pub struct MessageBuilder {
    message: Message,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self {
            message: Message {
                role: MessageRole::User,
                text: String::new(),
                audio: None,
            },
        }
    }

    pub fn with_role(mut self, role: MessageRole) -> Self {
        self.message.role = role;
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.message.text = text.to_string();
        self
    }

    pub fn with_audio(mut self, audio: AudioRef) -> Self {
        self.message.audio = Some(audio);
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub enum MessageRole {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "system")]
    System,
    #[serde(rename = "error")]
    Error,
}
