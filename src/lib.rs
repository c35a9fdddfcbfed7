mod capture;
mod client;
mod error;
pub mod interpreter;
mod playback;
pub mod poller;
mod session;

pub use runpod_chat_types as types;
pub use runpod_chat_utils as utils;

pub use capture::{AudioCapture, CaptureError};
pub use client::{Client, Config, ConfigBuilder, ConfigError, JobBackend, JobHandle, JobPayload, Stats};
pub use error::{BackendError, PollError, SessionError};
pub use playback::{ActivePlayback, AudioSink, NullSink, PlaybackController, PlaybackError};
pub use poller::{BackoffPolicy, PollOutcome, Poller};
pub use session::{ConversationSession, SessionBuilder, MICROPHONE_ERROR_TEXT, PLAYBACK_ERROR_TEXT};

#[cfg(feature = "device")]
pub use capture::CpalCapture;
#[cfg(feature = "device")]
pub use playback::CpalSink;
