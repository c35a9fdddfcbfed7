//! Turns terminal job outcomes into conversation entries. No I/O happens here.

use crate::error::BackendError;
use crate::poller::PollOutcome;
use crate::types::audio::{AudioRef, Base64EncodedAudioBytes};
use crate::types::{JobKind, Message, MessageRole};

pub const TIMEOUT_TEXT: &str = "The job processing took too long to complete.";
pub const FAILED_FALLBACK_TEXT: &str = "Job failed without error message";
pub const EMPTY_REPLY_TEXT: &str = "Sorry, the assistant returned an empty reply.";
pub const TEXT_ERROR_TEXT: &str = "Sorry, there was an error processing your message.";
pub const AUDIO_ERROR_TEXT: &str = "Sorry, there was an error processing your audio.";
pub const AUTH_ERROR_TEXT: &str =
    "The assistant is unavailable right now because it could not authenticate.";
pub const UNREACHABLE_TEXT: &str =
    "The assistant could not be reached. Please check your connection and try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum TurnResult {
    Reply {
        /// What the backend heard, for audio turns
        transcript: Option<String>,
        text: String,
        audio: Option<Base64EncodedAudioBytes>,
    },
    Error(String),
}

impl TurnResult {
    /// Entries to append, in conversation order.
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            TurnResult::Reply {
                transcript,
                text,
                audio,
            } => {
                let mut messages = Vec::with_capacity(2);
                if let Some(transcript) = transcript {
                    messages.push(Message::user(&transcript));
                }
                let mut reply = Message::builder()
                    .with_role(MessageRole::Assistant)
                    .with_text(&text);
                if let Some(audio) = audio {
                    reply = reply.with_audio(AudioRef::new(audio));
                }
                messages.push(reply.build());
                messages
            }
            TurnResult::Error(text) => vec![Message::error(&text)],
        }
    }
}

pub fn interpret(kind: JobKind, outcome: &PollOutcome) -> TurnResult {
    match outcome {
        PollOutcome::Completed(output) => {
            let Some(reply) = output
                .assistant_response()
                .filter(|reply| !reply.text().trim().is_empty())
            else {
                return TurnResult::Error(EMPTY_REPLY_TEXT.to_string());
            };
            let transcript = match kind {
                JobKind::Audio => output
                    .user_input()
                    .map(|input| input.text().trim())
                    .filter(|text| !text.is_empty())
                    .map(str::to_string),
                JobKind::Text => None,
            };
            TurnResult::Reply {
                transcript,
                text: reply.text().to_string(),
                audio: reply.audio().filter(|audio| !audio.is_empty()).cloned(),
            }
        }
        PollOutcome::Failed { reason } => TurnResult::Error(
            reason
                .as_deref()
                .filter(|reason| !reason.trim().is_empty())
                .unwrap_or(FAILED_FALLBACK_TEXT)
                .to_string(),
        ),
        PollOutcome::TimedOut { .. } => TurnResult::Error(TIMEOUT_TEXT.to_string()),
    }
}

pub fn interpret_error(kind: JobKind, err: &BackendError) -> TurnResult {
    let text = match err {
        BackendError::Auth(_) => AUTH_ERROR_TEXT,
        BackendError::Unreachable(_) => UNREACHABLE_TEXT,
        BackendError::BadRequest { .. } => generic_error_text(kind),
    };
    TurnResult::Error(text.to_string())
}

pub fn generic_error_text(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Text => TEXT_ERROR_TEXT,
        JobKind::Audio => AUDIO_ERROR_TEXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::api::{AssistantResponse, JobOutput};

    #[test]
    fn audio_turn_carries_transcript_and_audio() {
        let output = JobOutput::new()
            .with_user_input("is my garage covered?")
            .with_assistant_response(AssistantResponse::new("Yes, it is.").with_audio("UklGRg==".to_string()));
        let result = interpret(JobKind::Audio, &PollOutcome::Completed(output));

        let messages = result.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role(), MessageRole::User);
        assert_eq!(messages[0].text(), "is my garage covered?");
        assert_eq!(messages[1].role(), MessageRole::Assistant);
        assert_eq!(messages[1].audio().map(AudioRef::as_str), Some("UklGRg=="));
    }

    #[test]
    fn text_turn_ignores_echoed_input() {
        let output = JobOutput::new()
            .with_user_input("Hello")
            .with_assistant_response(AssistantResponse::new("Hi there"));
        let result = interpret(JobKind::Text, &PollOutcome::Completed(output));
        assert_eq!(
            result,
            TurnResult::Reply {
                transcript: None,
                text: "Hi there".to_string(),
                audio: None
            }
        );
    }

    #[test]
    fn missing_reply_text_is_an_error() {
        let output = JobOutput::new().with_assistant_response(AssistantResponse::new("  "));
        let result = interpret(JobKind::Text, &PollOutcome::Completed(output));
        assert_eq!(result, TurnResult::Error(EMPTY_REPLY_TEXT.to_string()));

        let result = interpret(JobKind::Audio, &PollOutcome::Completed(JobOutput::new()));
        assert_eq!(result, TurnResult::Error(EMPTY_REPLY_TEXT.to_string()));
    }

    #[test]
    fn failure_keeps_backend_reason() {
        let outcome = PollOutcome::Failed {
            reason: Some("model not loaded".to_string()),
        };
        assert_eq!(
            interpret(JobKind::Text, &outcome),
            TurnResult::Error("model not loaded".to_string())
        );

        let outcome = PollOutcome::Failed { reason: None };
        assert_eq!(
            interpret(JobKind::Text, &outcome),
            TurnResult::Error(FAILED_FALLBACK_TEXT.to_string())
        );
    }

    #[test]
    fn timeout_has_fixed_text() {
        let result = interpret(JobKind::Audio, &PollOutcome::TimedOut { attempts: 30 });
        assert_eq!(result, TurnResult::Error(TIMEOUT_TEXT.to_string()));
    }

    #[test]
    fn backend_errors_map_to_user_text() {
        let auth = interpret_error(JobKind::Text, &BackendError::Auth("401".to_string()));
        assert_eq!(auth, TurnResult::Error(AUTH_ERROR_TEXT.to_string()));

        let bad = BackendError::BadRequest {
            status: Some(400),
            message: "missing field".to_string(),
        };
        assert_eq!(
            interpret_error(JobKind::Audio, &bad),
            TurnResult::Error(AUDIO_ERROR_TEXT.to_string())
        );
    }
}
